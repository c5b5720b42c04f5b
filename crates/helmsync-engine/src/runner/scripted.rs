//! Scripted process runner for testing
//!
//! Replays canned outputs instead of spawning processes, and records every
//! invocation so tests can assert on exactly which commands were issued.

use helmsync_core::CommandPlan;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ProcessOutput, ProcessRunner};

/// A command as the runner received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub args: Vec<String>,
    pub structured_output: bool,
    pub dry_run: bool,
}

impl RecordedCall {
    /// Whether `pattern` appears as a contiguous run of arguments
    pub fn matches(&self, pattern: &[&str]) -> bool {
        contains_run(&self.args, pattern)
    }
}

#[derive(Debug)]
struct Rule {
    pattern: Vec<String>,
    responses: VecDeque<ProcessOutput>,
}

#[derive(Debug, Default)]
struct State {
    rules: Vec<Rule>,
    calls: Vec<RecordedCall>,
}

/// In-memory runner with queued responses per argument pattern.
///
/// Rules are checked in registration order. A rule with several queued
/// responses hands them out in order and keeps repeating the last one.
/// Unmatched commands fail to "spawn" so a missing script is never mistaken
/// for a successful command.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<State>>,
}

impl ScriptedRunner {
    /// Create a runner with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` for commands whose arguments contain `pattern`
    pub fn on(self, pattern: &[&str], output: ProcessOutput) -> Self {
        {
            let mut state = self.lock();
            let existing = state
                .rules
                .iter()
                .position(|r| r.pattern.iter().map(String::as_str).eq(pattern.iter().copied()));
            match existing {
                Some(idx) => state.rules[idx].responses.push_back(output),
                None => state.rules.push(Rule {
                    pattern: pattern.iter().map(|s| s.to_string()).collect(),
                    responses: VecDeque::from([output]),
                }),
            }
        }
        self
    }

    /// Every invocation so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of invocations containing `pattern`
    pub fn count(&self, pattern: &[&str]) -> usize {
        self.lock().calls.iter().filter(|c| c.matches(pattern)).count()
    }

    /// The most recent invocation containing `pattern`
    pub fn last_call(&self, pattern: &[&str]) -> Option<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .rev()
            .find(|c| c.matches(pattern))
            .cloned()
    }

    /// Forget recorded invocations (scripted responses are kept)
    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, plan: &CommandPlan) -> std::io::Result<ProcessOutput> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            args: plan.args().to_vec(),
            structured_output: plan.structured_output(),
            dry_run: plan.is_dry_run(),
        });

        let rule = state.rules.iter_mut().find(|r| {
            let pattern: Vec<&str> = r.pattern.iter().map(String::as_str).collect();
            contains_run(plan.args(), &pattern)
        });

        match rule {
            Some(rule) if rule.responses.len() > 1 => {
                Ok(rule.responses.pop_front().unwrap_or_default())
            }
            Some(rule) => Ok(rule.responses.front().cloned().unwrap_or_default()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no scripted response for `{}`", plan.command_line()),
            )),
        }
    }
}

fn contains_run(args: &[String], pattern: &[&str]) -> bool {
    pattern.is_empty()
        || args
            .windows(pattern.len())
            .any(|w| w.iter().map(String::as_str).eq(pattern.iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(args: &[&str]) -> CommandPlan {
        CommandPlan::builder("helm").args(args.iter().copied()).build()
    }

    #[test]
    fn test_scripted_responses_in_order_then_sticky() {
        let runner = ScriptedRunner::new()
            .on(&["list"], ProcessOutput::success("first"))
            .on(&["list"], ProcessOutput::success("second"));

        let list = plan(&["list", "--namespace", "default"]);
        assert_eq!(runner.run(&list).unwrap().stdout, "first");
        assert_eq!(runner.run(&list).unwrap().stdout, "second");
        assert_eq!(runner.run(&list).unwrap().stdout, "second");
        assert_eq!(runner.count(&["list"]), 3);
    }

    #[test]
    fn test_unmatched_command_fails_to_spawn() {
        let runner = ScriptedRunner::new().on(&["list"], ProcessOutput::success("[]"));
        let err = runner.run(&plan(&["install", "app"])).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_pattern_matches_contiguous_run() {
        let runner = ScriptedRunner::new().on(&["repo", "list"], ProcessOutput::success("[]"));
        assert!(runner.run(&plan(&["--kube-context", "kind", "repo", "list"])).is_ok());
        assert!(runner.run(&plan(&["repo", "update", "list"])).is_err());

        let last = runner.last_call(&["repo"]).unwrap();
        assert_eq!(last.args, vec!["repo", "update", "list"]);
    }

    #[test]
    fn test_clones_share_state() {
        let runner = ScriptedRunner::new().on(&["version"], ProcessOutput::success("v3"));
        let clone = runner.clone();
        clone.run(&plan(&["version"])).unwrap();
        assert_eq!(runner.count(&["version"]), 1);

        runner.reset_calls();
        assert!(clone.calls().is_empty());
    }
}
