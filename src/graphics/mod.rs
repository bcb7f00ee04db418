pub(crate) mod blocks;
pub mod image;
pub(crate) mod kitty;
pub mod placement;
pub(crate) mod sixel;

pub use self::image::{HalfBlockImage, Image, KittyImage, SixelImage};
pub use self::placement::{Placement, PlacementAction, PlacementStyle};
