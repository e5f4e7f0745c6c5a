/// Configuration for streaming rows through a splitter
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Emit rows as objects keyed by projection label instead of arrays
    pub keyed_output: bool,

    /// Log and skip rows that fail to parse, decode or split
    pub skip_malformed: bool,

    /// Pretty-print each output row
    pub pretty: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            keyed_output: true,
            skip_malformed: false,
            pretty: false,
        }
    }
}
