//! Helper traits for allocator trait bounds.
pub use walldist_traits::allocators::*;
