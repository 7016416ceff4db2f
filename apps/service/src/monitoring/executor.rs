use std::sync::Arc;

use tracing::{error, info, warn};

use super::alert::Transition;
use super::checker::Prober;
use super::types::{ActiveCheck, CheckFailure, Variant};
use crate::notifications::Notifier;

/// Check executor - runs one check across its variants and applies the outcome
pub struct CheckExecutor {
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
}

impl CheckExecutor {
    pub fn new(prober: Arc<dyn Prober>, notifier: Arc<dyn Notifier>) -> Self {
        Self { prober, notifier }
    }

    /// Run every variant of a check in order.
    ///
    /// A failing variant ends the run: in `both` mode an IPv4 failure means
    /// the IPv6 attempt is skipped and its streak is left untouched.
    /// Notifications are sent once the run is over, so a slow notifier never
    /// delays the next variant's attempt.
    pub async fn run_check(&self, check: &ActiveCheck) -> Result<(), CheckFailure> {
        let mut messages = Vec::new();
        let mut outcome = Ok(());
        for &variant in check.definition.network.variants() {
            let (result, message) = self.run_variant(check, variant).await;
            messages.extend(message);
            if result.is_err() {
                outcome = result;
                break;
            }
        }

        for message in messages {
            self.notify(message).await;
        }
        outcome
    }

    /// One attempt, returning its outcome and the notification it triggers
    async fn run_variant(
        &self,
        check: &ActiveCheck,
        variant: Variant,
    ) -> (Result<(), CheckFailure>, Option<String>) {
        let result = self.prober.probe(&check.definition, variant).await;
        let label = check.label(variant);

        match &result {
            Ok(()) => info!("{} test success", label),
            Err(reason) => warn!("{} test failed: {}", label, reason),
        }

        let (update, transition) = check.record_outcome(variant, result.is_ok());

        let message = match (transition, &result) {
            (Some(Transition::Alert), Err(reason)) => {
                warn!(streak = update.current, "{} crossed the failure threshold, alerting", label);
                Some(format!("test failed: {}: {}", label, reason))
            }
            (Some(Transition::Recovery), _) => {
                info!(failures = update.previous, "{} recovered", label);
                Some(format!("test recovered: {}", label))
            }
            _ => None,
        };

        (result, message)
    }

    /// Deliver a message, logging rather than propagating transport errors
    async fn notify(&self, message: String) {
        if let Err(e) = self.notifier.send(&message).await {
            error!("Failed to send notification {:?}: {}", message, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{CheckDefinition, NetworkMode, test_definition};
    use crate::notifications::recording::RecordingNotifier;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays queued outcomes per variant; passes once a queue is empty
    #[derive(Default)]
    struct ScriptedProber {
        script: Mutex<HashMap<Variant, VecDeque<Result<(), CheckFailure>>>>,
        calls: Mutex<Vec<Variant>>,
    }

    impl ScriptedProber {
        fn push(&self, variant: Variant, outcomes: impl IntoIterator<Item = bool>) {
            let mut script = self.script.lock().unwrap();
            let queue = script.entry(variant).or_default();
            for ok in outcomes {
                queue.push_back(if ok { Ok(()) } else { Err(CheckFailure::BodyMismatch("OK".into())) });
            }
        }

        fn calls(&self) -> Vec<Variant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, _: &CheckDefinition, variant: Variant) -> Result<(), CheckFailure> {
            self.calls.lock().unwrap().push(variant);
            self.script
                .lock()
                .unwrap()
                .get_mut(&variant)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok(()))
        }
    }

    fn setup(network: NetworkMode) -> (Arc<ScriptedProber>, Arc<RecordingNotifier>, CheckExecutor, ActiveCheck) {
        let prober = Arc::new(ScriptedProber::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let executor = CheckExecutor::new(prober.clone(), notifier.clone());
        let mut definition = test_definition("A");
        definition.network = network;
        (prober, notifier, executor, ActiveCheck::new(definition))
    }

    #[tokio::test]
    async fn test_alert_after_threshold_then_recovery() {
        let (prober, notifier, executor, check) = setup(NetworkMode::Default);
        prober.push(Variant::Default, [false, false, false, false, true]);

        for expected in [0, 0, 1, 1, 2] {
            let _ = executor.run_check(&check).await;
            assert_eq!(notifier.messages().len(), expected);
        }

        assert_eq!(
            notifier.messages(),
            vec![
                "test failed: A: response body did not match OK".to_string(),
                "test recovered: A".to_string(),
            ]
        );
        assert_eq!(check.current_streak(Variant::Default), 0);
        assert!(!check.is_alerting(Variant::Default));
    }

    #[tokio::test]
    async fn test_repeated_failures_do_not_realert() {
        let (prober, notifier, executor, check) = setup(NetworkMode::Default);
        prober.push(Variant::Default, [false; 10]);

        for _ in 0..10 {
            assert!(executor.run_check(&check).await.is_err());
        }
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(check.current_streak(Variant::Default), 10);
    }

    #[tokio::test]
    async fn test_both_mode_ipv4_failure_skips_ipv6() {
        let (prober, _notifier, executor, check) = setup(NetworkMode::Both);
        prober.push(Variant::V4, [false]);

        assert!(executor.run_check(&check).await.is_err());
        // Early return: the IPv6 attempt never ran, so its streak did not move.
        assert_eq!(prober.calls(), vec![Variant::V4]);
        assert_eq!(check.current_streak(Variant::V4), 1);
        assert_eq!(check.current_streak(Variant::V6), 0);
    }

    #[tokio::test]
    async fn test_ipv4_streak_alerts_while_ipv6_passes() {
        let (prober, notifier, executor, check) = setup(NetworkMode::Both);

        assert_eq!(executor.run_check(&check).await, Ok(()));
        assert_eq!(prober.calls(), vec![Variant::V4, Variant::V6]);

        prober.push(Variant::V4, [false, false, false]);
        for _ in 0..3 {
            assert!(executor.run_check(&check).await.is_err());
        }

        assert_eq!(check.current_streak(Variant::V4), 3);
        assert_eq!(check.current_streak(Variant::V6), 0);
        assert_eq!(notifier.messages(), vec!["test failed: A (IPv4): response body did not match OK"]);
        assert!(check.is_alerting(Variant::V4));
        assert!(!check.is_alerting(Variant::V6));
    }

    #[tokio::test]
    async fn test_forced_family_uses_only_that_variant() {
        let (prober, _notifier, executor, check) = setup(NetworkMode::ForceV6);

        assert_eq!(executor.run_check(&check).await, Ok(()));
        assert_eq!(prober.calls(), vec![Variant::V6]);
    }

    #[tokio::test]
    async fn test_notifier_failure_keeps_transition() {
        let prober = Arc::new(ScriptedProber::default());
        let notifier = Arc::new(RecordingNotifier::failing());
        let executor = CheckExecutor::new(prober.clone(), notifier.clone());
        let mut definition = test_definition("A");
        definition.notify_threshold = 1;
        let check = ActiveCheck::new(definition);
        prober.push(Variant::Default, [false, false]);

        let _ = executor.run_check(&check).await;
        let _ = executor.run_check(&check).await;

        // The alert was attempted once and is not retried on the next failure.
        assert_eq!(notifier.messages().len(), 1);
        assert!(check.is_alerting(Variant::Default));
    }

    /// Snapshots which attempts had already run when each message went out
    struct SnapshotNotifier {
        prober: Arc<ScriptedProber>,
        seen: Mutex<Vec<(String, Vec<Variant>)>>,
    }

    #[async_trait::async_trait]
    impl Notifier for SnapshotNotifier {
        async fn send(&self, message: &str) -> Result<(), crate::notifications::SenderError> {
            self.seen.lock().unwrap().push((message.to_string(), self.prober.calls()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ipv4_recovery_notice_does_not_delay_ipv6_attempt() {
        let prober = Arc::new(ScriptedProber::default());
        let notifier = Arc::new(SnapshotNotifier { prober: prober.clone(), seen: Mutex::default() });
        let executor = CheckExecutor::new(prober.clone(), notifier.clone());
        let mut definition = test_definition("A");
        definition.network = NetworkMode::Both;
        definition.notify_threshold = 1;
        let check = ActiveCheck::new(definition);
        prober.push(Variant::V4, [false, true]);

        assert!(executor.run_check(&check).await.is_err());
        assert_eq!(executor.run_check(&check).await, Ok(()));

        let seen = notifier.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, vec![Variant::V4]);
        assert_eq!(seen[1].0, "test recovered: A (IPv4)");
        // The IPv6 attempt of the second run finished before the recovery went out.
        assert_eq!(seen[1].1, vec![Variant::V4, Variant::V4, Variant::V6]);
    }
}
