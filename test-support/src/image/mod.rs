//! 镜像构造器

pub mod dtb;
pub mod ext4;
pub mod fat;
pub mod mbr;
