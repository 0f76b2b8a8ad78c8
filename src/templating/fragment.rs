/// A prioritized chunk of the notification template contributed by an
/// adapter. The higher the priority, the earlier in the message the fragment
/// is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub content: String,
    pub priority: i64,
}

impl Fragment {
    pub fn new(content: impl Into<String>, priority: i64) -> Self {
        Fragment {
            content: content.into(),
            priority,
        }
    }
}
