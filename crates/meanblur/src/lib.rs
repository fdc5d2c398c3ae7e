#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use meanblur_image as image;

#[doc(inline)]
pub use meanblur_imgproc as imgproc;

#[doc(inline)]
pub use meanblur_io as io;
