pub mod answer;
pub mod entity;
pub mod question;
pub mod value;

pub use answer::{AnswerGrade, LikelihoodFactors, LikelihoodTable, ParseAnswerError};
pub use entity::Entity;
pub use question::Question;
pub use value::AttributeValue;
