/// The runtime limit/offset snapshot set through the imperative query API.
///
/// A runtime-set value always overrides the corresponding clause in the
/// parsed statement; offset and limit are decided independently. The
/// snapshot is part of the query-plan cache key because presence or absence
/// of either field changes the emitted pipeline stages.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryOptions {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}
