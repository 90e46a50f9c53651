pub mod engine;
pub mod parser;
pub mod snapshot;
pub mod sources;
pub mod suffix_trie;

pub use engine::BlockList;
pub use parser::{parse_list_line, parse_list_text, ListEntry};
pub use snapshot::BlockSnapshot;
pub use sources::BlocklistDownloader;
pub use suffix_trie::SuffixTrie;
