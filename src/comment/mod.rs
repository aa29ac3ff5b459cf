//! `CommentBuffer`/`CommentChunker`: accumulate per-application results and
//! render them into one or more platform-sized review comments.

pub mod buffer;
pub mod chunker;

pub use buffer::{BuildCommentParams, Message};
pub use chunker::{fence_count, split_content_preserving_code_blocks, Chunker, SPLIT_WARNING};
