pub mod appeal_answers;
pub mod appeal_comments;
pub mod appeal_history;
pub mod appeal_views;
pub mod appeals;
pub mod intake_appeals;
pub mod intake_history;
pub mod intake_users;
pub mod mahallas;
pub mod organizations;
pub mod sectors;
pub mod users;
