//! Background asset loading into the live scene

pub mod config;
pub mod parser;
pub mod platform;
pub mod worker;

pub use config::LoaderConfig;
pub use parser::{AssetParser, GeometryResource, JsonSceneParser, NodeFactory, SubgraphBuilder};
pub use platform::{DirectoryReader, FileReader, MemoryReader, PlatformBinding, ReaderBinding};
pub use worker::{LoadCallback, LoaderHandle, LoaderState, ModelLoader, ParserFactory};
