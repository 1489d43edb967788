//! バイト列のキーの集合を整数値に対応付ける、静的なDoubleArray(ダブル配列trie)
//!
//! ```
//! let keys = ["test", "テスト", "テストケース"];
//! let mut sorted: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
//! sorted.sort();
//!
//! let mut da = darts::DoubleArray::new();
//! da.build(&sorted).unwrap();
//! assert_eq!(da.exact_match_search("test".as_bytes()), Some(0));
//! assert_eq!(da.common_prefix_search("テストケース".as_bytes()).len(), 2);
//! ```
mod double_array;
mod error;
mod trie;
mod util;

pub use double_array::DoubleArray;
pub use error::{DartsError, DartsResult};
pub use trie::unit::{BASE_LIMIT, VALUE_LIMIT};
pub use trie::{Builder, PrefixMatch, Searcher, Traverse, Unit};
