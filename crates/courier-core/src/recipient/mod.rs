//! Recipients, user lookup and message addressing.

mod assembler;
mod model;

pub use assembler::{RecipientAssembler, TEST_RECIPIENT_NAME};
pub use model::{MemoryUserDirectory, Recipient, UserId, UserLookup};
