mod countdown;
mod driver;
mod loader;
mod runner;
mod view;

pub use driver::QuizDriver;
pub use loader::{LoadedSession, SessionLoader};
pub use runner::{QuizCommand, QuizEvent, QuizRunner};
pub use view::QuizView;
