/// Options used when beginning transactions through a [`crate::Db`].
#[derive(Clone, Debug)]
pub struct Options {
    /// Enable or disable metrics collection.
    pub(crate) metrics: bool,
    /// Panic instead of logging when a transaction is dropped without being finished.
    pub(crate) strict_finish: bool,
}

impl Options {
    /// Create a new `Options` instance with the default values.
    pub fn new() -> Self {
        Self {
            metrics: false,
            strict_finish: false,
        }
    }

    /// Set metrics collection on or off.
    ///
    /// Default: off.
    pub fn metrics(&mut self, metrics: bool) {
        self.metrics = metrics;
    }

    /// Set to `true` to panic when a transaction is dropped before it was committed or rolled
    /// back, instead of logging a warning.
    ///
    /// Useful in tests to catch leaked transactions. Either way, the buffered changes of such a
    /// transaction are discarded.
    ///
    /// Default: `false`.
    pub fn strict_finish(&mut self, strict_finish: bool) {
        self.strict_finish = strict_finish;
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}
