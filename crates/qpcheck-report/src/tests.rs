#[cfg(test)]
mod tests {
    use crate::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn report(trial: usize, verdict: Verdict) -> TrialReport {
        let inputs = serde_json::json!({
            "P": [[1.0, 0.0], [0.0, 1.0]],
            "q": [0.0, 0.0],
            "A_eq": null,
        });
        let outputs = serde_json::json!({
            "reference": [0.0, 0.0],
            "candidate": [0.0, 2.0],
        });
        TrialReport::new(trial, 100.0, inputs, outputs, verdict).unwrap()
    }

    #[test]
    fn test_trial_report_hash() {
        let a = report(0, Verdict::Passed);
        let b = report(1, Verdict::Failed("x[1] differs".to_string()));
        assert_eq!(a.input_hash.len(), 64);
        // same inputs, same digest regardless of trial or verdict
        assert_eq!(a.input_hash, b.input_hash);
    }

    #[test]
    fn test_input_digest_is_sha256_of_compact_json() {
        let digest = crate::reporter::input_digest(&serde_json::json!({"q": [1.0, 2.0]})).unwrap();
        assert_eq!(
            digest,
            "afc2ec119d9db93f775ecdcd327b7207916439425c0313b12b3981e96518244a"
        );
        let other = crate::reporter::input_digest(&serde_json::json!({"q": [1.0, 2.5]})).unwrap();
        assert_ne!(digest, other);
    }

    #[test]
    fn test_memory_reporter() {
        let mut reporter = MemoryReporter::new();
        reporter.publish(&report(0, Verdict::Passed)).unwrap();
        reporter
            .publish(&report(1, Verdict::Failed("mismatch".to_string())))
            .unwrap();
        reporter.finish(2, 1).unwrap();

        assert_eq!(reporter.reports().len(), 2);
        assert_eq!(reporter.failures().count(), 1);
        assert_eq!(reporter.totals(), Some((2, 1)));
    }

    #[test]
    fn test_console_reporter_verbose_prints_everything() {
        let buf = SharedBuf::default();
        let mut reporter = ConsoleReporter::with_writer(Box::new(buf.clone()), true);
        reporter.publish(&report(0, Verdict::Passed)).unwrap();

        let text = buf.contents();
        assert!(text.contains("[Test input matrices]"));
        assert!(text.contains("  [1.0,0.0]"));
        assert!(text.contains("[trial passed]"));
        // P is printed before q
        assert!(text.find("P =").unwrap() < text.find("q =").unwrap());
    }

    #[test]
    fn test_console_reporter_quiet_prints_only_failures() {
        let buf = SharedBuf::default();
        let mut reporter = ConsoleReporter::with_writer(Box::new(buf.clone()), false);
        reporter.publish(&report(0, Verdict::Passed)).unwrap();
        assert!(buf.contents().is_empty());

        reporter
            .publish(&report(1, Verdict::Failed("x[1] differs by 2".to_string())))
            .unwrap();
        reporter.finish(2, 1).unwrap();

        let text = buf.contents();
        assert!(text.contains("[trial FAILED: x[1] differs by 2]"));
        assert!(text.contains("failed trials: 1 of 2"));
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_value(Verdict::Failed("why".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"verdict": "failed", "detail": "why"}));
    }
}
