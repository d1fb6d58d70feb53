mod contest;
mod ids;
mod launch;
mod question;
mod result;
mod session;
mod settings;
mod snapshot;

pub use ids::{AttemptId, ContestId, ParseSessionKeyError, QuestionId, SessionKey};

pub use contest::{Contest, ContestWindow, Coordinates, GeoFence, haversine_m};
pub use launch::{
    ALL_FILTER, DEFAULT_DURATION_SECS, DEFAULT_QUESTION_LIMIT, PRACTICE_TITLE, QuizLaunch,
    duration_secs_from_minutes,
};
pub use question::{Answer, OPTION_COUNT, Question, SubmittedAnswer, option_label};
pub use result::{AnswerReview, QuizResult};
pub use session::{
    LOW_TIME_SECS, QuizProgress, QuizSession, QuizStatus, SessionError, Step, Submission,
    format_clock,
};
pub use settings::{ClientSettings, ClientSettingsDraft, SettingsError};
pub use snapshot::{QuizSnapshot, SnapshotError};
