mod hash;

pub use hash::compute_content_hash;

/// Span- and name-keyed maps built per query.
pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;
