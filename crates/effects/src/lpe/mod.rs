//! The built-in effects.

mod bend_path;
mod bool_op;
mod clone_original;
mod copy_rotate;
mod fill_between_many;
mod fillet_chamfer;
mod mirror_symmetry;
mod roughen;
mod split;

pub use bend_path::BendPath;
pub use bool_op::{BoolOperation, BoolOperationEffect, FillType};
pub use clone_original::CloneOriginal;
pub use copy_rotate::CopyRotate;
pub use fill_between_many::FillBetweenMany;
pub use fillet_chamfer::{FilletChamfer, FilletMethod};
pub use mirror_symmetry::{MirrorMode, MirrorSymmetry};
pub use roughen::{DivisionMethod, HandleMethod, Roughen};
