#![forbid(unsafe_code)]

pub mod repository;
pub mod rest;

pub use repository::{
    AttemptRecord, Bank, BankError, InMemoryBank, ProgressStore, QuestionBank, QuestionRecord,
    ResultId, ResultStore, TestResultRecord,
};
pub use rest::{RestBank, RestBankConfig};
