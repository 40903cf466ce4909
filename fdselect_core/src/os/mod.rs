//! OS 固有の select(2) 抽象層。
//! fd_set のビット配置と呼び出し形式はコンパイル時にプラットフォーム毎に選択される。

mod fdset;
pub use fdset::FdSet;

mod timeout;
pub use timeout::Timeout;

// Linux → pselect(2), macOS/BSD → select(2); the choice lives in `selector`.
pub mod selector;
pub use selector::{Selector, SysSelector};

mod multiplex;
pub use multiplex::{retry_select, select, select_with, RetryPolicy};

pub mod pipe;
pub use pipe::{set_nonblocking, Pipe};
