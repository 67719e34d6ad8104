/// Declared and live index definitions.
pub mod def;
/// Pure index diffing, including text-index normalization.
pub mod compare;

pub use compare::{index_has_changed, text_index_has_changed};
pub use def::{
    INDEX_OPTIONS,
    IndexDef,
    IndexKeys,
    IndexSpecs,
    LiveIndex,
    TEXT_KEY_FIELDS,
    UnnamedIndexDef,
    is_text_direction,
};
