//! Pluggable output verification: given an output file and an answer file,
//! decide how many cases passed and whether the submission is accepted.

use std::io::{BufRead, BufReader};
use std::path::Path;

use async_trait::async_trait;

use crate::error::Verdict;

/// Outcome of comparing a submission's output against the expected answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub cases_passed: u64,
    pub verdict: Option<Verdict>,
}

impl VerifyOutcome {
    pub fn success(cases_passed: u64) -> Self {
        VerifyOutcome {
            cases_passed,
            verdict: None,
        }
    }

    pub fn failure(cases_passed: u64, verdict: Verdict) -> Self {
        VerifyOutcome {
            cases_passed,
            verdict: Some(verdict),
        }
    }
}

/// A pluggable strategy for comparing a run's output against the expected
/// answer. Implementations may run blocking file IO; the trait is async so
/// strategies backed by remote storage or checksumming services also fit.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, output_path: &Path, answer_path: &Path) -> VerifyOutcome;
}

/// The default strategy: each line is one test case, compared byte-exact
/// (including the trailing newline). No whitespace normalization is
/// performed — this is a deliberate design choice, not an oversight;
/// normalization belongs in an alternative [`Verifier`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LinePairedVerifier;

#[async_trait]
impl Verifier for LinePairedVerifier {
    async fn verify(&self, output_path: &Path, answer_path: &Path) -> VerifyOutcome {
        let output_file = match std::fs::File::open(output_path) {
            Ok(f) => f,
            Err(_) => {
                return VerifyOutcome::failure(
                    0,
                    Verdict::OutputMissing(format!("{} not found", output_path.display())),
                );
            }
        };
        let answer_file = match std::fs::File::open(answer_path) {
            Ok(f) => f,
            Err(_) => {
                return VerifyOutcome::failure(
                    0,
                    Verdict::AnswerMissing(format!("{} not found", answer_path.display())),
                );
            }
        };

        let mut output_reader = BufReader::new(output_file);
        let mut answer_reader = BufReader::new(answer_file);
        let mut cases = 0u64;

        loop {
            let mut answer_line = String::new();
            let mut output_line = String::new();

            let answer_read = answer_reader.read_line(&mut answer_line);
            let output_read = output_reader.read_line(&mut output_line);

            match (answer_read, output_read) {
                (Ok(0), Ok(0)) => return VerifyOutcome::success(cases),
                (Ok(0), Ok(_)) => {
                    return VerifyOutcome::failure(
                        cases,
                        Verdict::AnswerMissing(format!(
                            "answer file ended before output at case {cases}"
                        )),
                    );
                }
                (Ok(_), Ok(0)) => {
                    return VerifyOutcome::failure(
                        cases,
                        Verdict::OutputMissing(format!(
                            "output file ended before answer at case {cases}"
                        )),
                    );
                }
                (Err(e), _) => {
                    return VerifyOutcome::failure(
                        cases,
                        Verdict::AnswerMissing(format!("answer file error: {e}")),
                    );
                }
                (_, Err(e)) => {
                    return VerifyOutcome::failure(
                        cases,
                        Verdict::OutputMissing(format!("output file error: {e}")),
                    );
                }
                (Ok(_), Ok(_)) => {
                    if answer_line != output_line {
                        return VerifyOutcome::failure(
                            cases,
                            Verdict::WrongAnswer(format!("wrong answer at case {cases}")),
                        );
                    }
                    cases += 1;
                }
            }
        }
    }
}
