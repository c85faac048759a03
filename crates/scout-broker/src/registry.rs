//! Target registry: the static tool-name -> [`ToolSpec`] table.
//!
//! Pure and in-memory. The only failure mode is a lookup miss.

use std::collections::HashMap;
use std::sync::Arc;

use scout_types::{BrokerError, ExitCodePolicy, ExitOutcome, ExitRule, ToolSpec};

/// Immutable registry of tool descriptors, built once at process start.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<ToolSpec>>,
}

impl ToolRegistry {
    /// Create an empty registry. Mostly useful for tests; production code
    /// starts from [`ToolRegistry::builtin`].
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Rejects duplicate names.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), BrokerError> {
        if self.tools.contains_key(&spec.name) {
            return Err(BrokerError::Config(format!(
                "tool already registered: {}",
                spec.name
            )));
        }
        self.tools.insert(spec.name.clone(), Arc::new(spec));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ToolSpec>, BrokerError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownTool {
                name: name.to_string(),
            })
    }

    /// All registered tools, sorted by name for deterministic output.
    pub fn list(&self) -> Vec<Arc<ToolSpec>> {
        let mut specs: Vec<Arc<ToolSpec>> = self.tools.values().cloned().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The compiled-in target table.
    ///
    /// Official images are preferred where the vendor publishes one; tools
    /// without one fall back to the shared toolbox image; plain lookup
    /// utilities are host-binary-only. Timeouts reflect tool class: scans
    /// get minutes, lookups get seconds. Exit-code policies follow each
    /// tool's documented contract; tools that signal findings through a
    /// specific nonzero code declare it explicitly.
    pub fn builtin() -> Self {
        let specs = vec![
            ToolSpec::new("nmap")
                .official_image("instrumentisto/nmap:latest")
                .timeout_secs(600)
                .description("network port scanner"),
            ToolSpec::new("nuclei")
                .official_image("projectdiscovery/nuclei:latest")
                .timeout_secs(900)
                .description("template-based vulnerability scanner"),
            ToolSpec::new("subfinder")
                .official_image("projectdiscovery/subfinder:latest")
                .timeout_secs(300)
                .description("passive subdomain enumerator"),
            ToolSpec::new("httpx")
                .official_image("projectdiscovery/httpx:latest")
                .timeout_secs(300)
                .description("HTTP probe and fingerprinter"),
            ToolSpec::new("dnsx")
                .official_image("projectdiscovery/dnsx:latest")
                .timeout_secs(120)
                .description("DNS resolution toolkit"),
            ToolSpec::new("amass")
                .official_image("caffix/amass:latest")
                .timeout_secs(900)
                .description("attack surface mapper"),
            ToolSpec::new("sqlmap")
                .timeout_secs(1800)
                .description("SQL injection scanner"),
            // nikto exits 1 when it reports findings, 0 when the scan ran clean.
            ToolSpec::new("nikto")
                .timeout_secs(1200)
                .exit_policy(ExitCodePolicy::new(vec![
                    ExitRule::single(0, ExitOutcome::Success),
                    ExitRule::single(1, ExitOutcome::Findings),
                ]))
                .description("web server scanner"),
            ToolSpec::new("whatweb")
                .timeout_secs(300)
                .description("web technology fingerprinter"),
            ToolSpec::new("whois")
                .host_only()
                .timeout_secs(30)
                .description("registration data lookup"),
            ToolSpec::new("dig")
                .host_only()
                .timeout_secs(30)
                .description("DNS lookup utility"),
        ];

        let mut tools = HashMap::with_capacity(specs.len());
        for spec in specs {
            tools.insert(spec.name.clone(), Arc::new(spec));
        }
        Self { tools }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
