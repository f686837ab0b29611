mod extension;

pub use extension::Extension;
