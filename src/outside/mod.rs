mod command;
mod ytdl;

pub use command::Capture;
pub use ytdl::{MediaProducer, Ytdl};
