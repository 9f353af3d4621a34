// rust/sen1floods-core/src/dataset/mod.rs

//! Dataset adapters.
//!
//! Both adapters turn a split manifest into a stream of decoded examples
//! through the same [`FileResolver`](crate::resolver::FileResolver). They
//! differ only in which splits they expose, how files are fetched, and what
//! processing is applied.
//!
//! # Example
//!
//! ```ignore
//! use sen1floods_core::dataset::{DatasetSource, FloodDataset, Split, StreamOptions};
//!
//! let dataset = FloodDataset::new("/data/sen1floods11", resolver);
//! let train = dataset.open_split(Split::Train)?;
//! println!("{} examples", train.len()?);
//!
//! let options = StreamOptions { stream: true, ..StreamOptions::default() };
//! for example in train.examples(&options)? {
//!     let example = example?;
//!     // example.image is (512, 512, 2), example.mask is (512, 512, 1)
//! }
//! ```

mod builder;
mod iterator;
mod schema;
mod standalone;
mod traits;

pub use builder::{BuilderOptions, Sen1Floods11Builder, DATA_DIR};
pub use iterator::{Examples, SplitSource, StreamOptions};
pub use schema::{ArraySpec, DType, DatasetInfo, FeatureSchema};
pub use standalone::FloodDataset;
pub use traits::{DatasetSource, Example, Split};
