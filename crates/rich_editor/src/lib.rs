mod bullet;
mod commands;
mod config;
mod core;
mod dialog;
mod editor;
mod markup;
mod normalize;
mod ops;
mod port;
mod selection;
mod serde_value;
mod surface;
mod toolbar;

pub use crate::bullet::*;
pub use crate::config::*;
pub use crate::core::*;
pub use crate::dialog::*;
pub use crate::editor::*;
pub use crate::markup::*;
pub use crate::normalize::*;
pub use crate::ops::*;
pub use crate::port::*;
pub use crate::selection::*;
pub use crate::serde_value::*;
pub use crate::surface::*;
pub use crate::toolbar::*;
