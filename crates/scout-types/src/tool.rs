//! Static tool descriptors and exit-code policies.
//!
//! A [`ToolSpec`] describes how a named external tool prefers to run: via a
//! vendor-published image, via the locally built shared image, or only as a
//! host binary. The [`ExitCodePolicy`] captures each tool's exit-code
//! contract, because scanners disagree about what nonzero means.

use std::time::Duration;

/// Reference for the locally built multi-tool image shared by tools that
/// have no vendor-published image of their own.
pub const DEFAULT_SHARED_IMAGE: &str = "scout/toolbox:latest";

/// What a matching exit code means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The tool ran fine; whether it found anything is decided by whether
    /// it printed anything to stdout.
    Success,
    /// The tool ran fine and definitely found nothing to report.
    Clean,
    /// The tool ran fine and definitely produced findings, regardless of
    /// stdout content.
    Findings,
    /// The tool itself failed.
    Failure,
}

/// A single exit-code rule: an inclusive code range mapped to an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRule {
    pub lo: i32,
    pub hi: i32,
    pub outcome: ExitOutcome,
}

impl ExitRule {
    /// Rule matching exactly one exit code.
    pub fn single(code: i32, outcome: ExitOutcome) -> Self {
        Self {
            lo: code,
            hi: code,
            outcome,
        }
    }

    /// Rule matching an inclusive range of exit codes.
    pub fn range(lo: i32, hi: i32, outcome: ExitOutcome) -> Self {
        Self { lo, hi, outcome }
    }

    pub fn matches(&self, code: i32) -> bool {
        code >= self.lo && code <= self.hi
    }
}

/// Ordered list of [`ExitRule`]s; the first matching rule wins.
///
/// Exit codes not covered by any rule are surfaced as unexpected by the
/// result normalizer, so a policy only needs to declare the codes the tool
/// actually documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCodePolicy {
    rules: Vec<ExitRule>,
}

impl ExitCodePolicy {
    pub fn new(rules: Vec<ExitRule>) -> Self {
        Self { rules }
    }

    /// Classify an exit code. `None` means the code is not covered by any
    /// declared rule.
    pub fn classify(&self, code: i32) -> Option<ExitOutcome> {
        self.rules.iter().find(|r| r.matches(code)).map(|r| r.outcome)
    }

    pub fn rules(&self) -> &[ExitRule] {
        &self.rules
    }
}

impl Default for ExitCodePolicy {
    /// The common contract: zero means the run succeeded (findings decided
    /// by stdout content), everything else is unexpected.
    fn default() -> Self {
        Self {
            rules: vec![ExitRule::single(0, ExitOutcome::Success)],
        }
    }
}

/// Static descriptor for one registered tool.
///
/// Created once at process start from the compiled-in target table and
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Unique tool name; also the binary name looked up on the host PATH.
    pub name: String,
    /// Vendor-published image reference. Takes priority when set.
    pub official_image: Option<String>,
    /// Shared multi-tool image used when no official image is configured.
    /// `None` means the tool only runs as a host binary.
    pub shared_image: Option<String>,
    /// Exit-code contract for this tool.
    pub exit_code_policy: ExitCodePolicy,
    /// Wall-clock budget when the caller does not override it. Scan-class
    /// tools legitimately run minutes longer than lookup-class tools.
    pub default_timeout: Duration,
    /// One-line description for operator-facing listings.
    pub description: String,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            official_image: None,
            shared_image: Some(DEFAULT_SHARED_IMAGE.to_string()),
            exit_code_policy: ExitCodePolicy::default(),
            default_timeout: Duration::from_secs(120),
            description: String::new(),
        }
    }

    pub fn official_image(mut self, image: impl Into<String>) -> Self {
        self.official_image = Some(image.into());
        self
    }

    pub fn shared_image(mut self, image: impl Into<String>) -> Self {
        self.shared_image = Some(image.into());
        self
    }

    /// Restrict the tool to a host binary: no image fallback of any kind.
    pub fn host_only(mut self) -> Self {
        self.official_image = None;
        self.shared_image = None;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout = Duration::from_secs(secs);
        self
    }

    pub fn exit_policy(mut self, policy: ExitCodePolicy) -> Self {
        self.exit_code_policy = policy;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// True when neither an official nor a shared image is configured.
    pub fn is_host_only(&self) -> bool {
        self.official_image.is_none() && self.shared_image.is_none()
    }
}
