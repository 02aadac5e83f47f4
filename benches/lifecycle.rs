use criterion::{criterion_group, criterion_main, Criterion, black_box};

use vireo::resource::{Context, DeviceHandle, GpuResource, ManualDevice, NodeArena};

struct Buffer {
    bytes: usize,
    resident: bool,
}

impl GpuResource for Buffer {
    fn create_gpu(&mut self, _device: DeviceHandle) {
        self.resident = black_box(self.bytes) > 0;
    }

    fn destroy_gpu(&mut self, _device: DeviceHandle) {
        self.resident = false;
    }
}

fn bench_register_and_tick_1000(c: &mut Criterion) {
    let device = ManualDevice::new();
    if let Some(handle) = DeviceHandle::new(1) {
        device.make_current(handle);
    }

    c.bench_function("register_and_tick_1000", |b| {
        b.iter(|| {
            let mut context = Context::new();
            context.attach_to_device(&device);
            for i in 0..1000 {
                context.register_resource(Buffer {
                    bytes: i,
                    resident: false,
                });
            }
            black_box(context.tick())
        });
    });
}

fn bench_attach_detach_1000(c: &mut Criterion) {
    let device = ManualDevice::new();
    if let Some(handle) = DeviceHandle::new(1) {
        device.make_current(handle);
    }
    let mut context = Context::new();
    context.attach_to_device(&device);
    for i in 0..1000 {
        context.register_resource(Buffer {
            bytes: i,
            resident: false,
        });
    }
    context.tick();

    c.bench_function("attach_detach_1000", |b| {
        b.iter(|| {
            black_box(context.detach_from_device(&device));
            black_box(context.attach_to_device(&device))
        });
    });
}

fn bench_list_splice(c: &mut Criterion) {
    let mut arena = NodeArena::new();
    let active = arena.new_list();
    let pending = arena.new_list();
    for i in 0..10_000u32 {
        arena.prepend(active, i);
    }

    c.bench_function("prepend_and_adopt_100", |b| {
        b.iter(|| {
            for i in 0..100u32 {
                arena.prepend(pending, black_box(i));
            }
            arena.prepend_and_adopt(active, pending);
            // Keep the active list at a steady size.
            for _ in 0..100 {
                if let Some(first) = arena.first(active) {
                    arena.remove(first);
                }
            }
        });
    });
}

criterion_group!(
    benches,
    bench_register_and_tick_1000,
    bench_attach_detach_1000,
    bench_list_splice,
);
criterion_main!(benches);
