//! Dense index types.
//!
//! Every namespace in the symbol table (scopes, variables, labels, used
//! objects, models, files, enums, entity types) hands out ids in strict
//! insertion order, so that downstream tables (storage allocation,
//! relocation) can index into a plain `Vec` instead of hashing. Each crate
//! defines its own newtype with [`index_vec::define_index_type!`]; this
//! module only re-exports the machinery so call sites don't need a direct
//! dependency on `index_vec`.

pub use index_vec::{self, IndexVec};
