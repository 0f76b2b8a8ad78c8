pub mod composer;
pub mod fragment;
pub mod rewrite;

pub use composer::build_message_template;
pub use fragment::Fragment;
pub use rewrite::MessageRewriter;
