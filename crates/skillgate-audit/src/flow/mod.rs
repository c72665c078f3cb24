//! Cross-file capability flow analysis.
//!
//! Two passes over the JavaScript-family files of a package:
//!
//! ```text
//! 1. per file: import edges + capability classification
//! 2. per resolved relative edge (exporter <- importer):
//!      exporter reads credentials, importer makes network calls
//!        -> critical credential exfiltration  [exporter, importer]
//!      exporter reads credentials, importer encodes data,
//!      an importer of the importer makes network calls
//!        -> critical encoded exfiltration     [exporter, importer, downstream]
//!      exporter executes code, importer makes network calls
//!        -> high exec + network               [exporter, importer]
//! ```
//!
//! Pass 2 only runs once pass 1 has seen every file; a cancelled analysis
//! yields no chains at all.

pub mod capabilities;
pub mod imports;
pub mod resolve;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

use skillgate_core::{AuditError, ChainKind, FlowChain, FlowReport, Result};

use crate::cancel::Cancellation;
use crate::discovery::{package_files, read_text};

pub use capabilities::{Capabilities, Capability, CapabilityPatterns, Evidence};
pub use imports::{ImportEdge, ImportPatterns};
pub use resolve::resolve_import;

/// Extensions analyzed for imports and capabilities.
pub const FLOW_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "tsx", "jsx", "mts", "cts"];

/// Import graph and capability chain detector.
#[derive(Debug, Clone)]
pub struct FlowAnalyzer {
    imports: ImportPatterns,
    capabilities: CapabilityPatterns,
    max_file_size: u64,
}

/// Output of pass 1.
#[derive(Debug, Default)]
struct Graph {
    capabilities: BTreeMap<String, Capabilities>,
    /// target -> files importing it
    importers: BTreeMap<String, BTreeSet<String>>,
    edges: usize,
}

impl FlowAnalyzer {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            imports: ImportPatterns::new(),
            capabilities: CapabilityPatterns::new(),
            max_file_size,
        }
    }

    /// Analyze a package to completion.
    pub fn analyze(&self, root: &Path) -> FlowReport {
        let graph = self.build_graph(root, &Cancellation::new()).unwrap_or_default();
        Self::report(&graph)
    }

    /// Analyze, checking `cancel` between files.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Cancelled`] when cancelled before the graph is
    /// complete.
    pub fn analyze_cancellable(&self, root: &Path, cancel: &Cancellation) -> Result<FlowReport> {
        let graph = self.build_graph(root, cancel)?;
        Ok(Self::report(&graph))
    }

    fn build_graph(&self, root: &Path, cancel: &Cancellation) -> Result<Graph> {
        let files = package_files(root);
        let known: BTreeSet<String> = files.iter().map(|f| f.rel_path.clone()).collect();
        let mut graph = Graph::default();

        for file in &files {
            if cancel.is_cancelled() {
                debug!(root = %root.display(), "flow analysis cancelled");
                return Err(AuditError::Cancelled);
            }
            let Some(ext) = file.extension() else { continue };
            if !FLOW_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            let Some(content) = read_text(file, self.max_file_size) else {
                continue;
            };

            graph
                .capabilities
                .insert(file.rel_path.clone(), self.capabilities.classify(&content));

            for edge in self.imports.extract(&file.rel_path, &content) {
                if !edge.is_relative {
                    continue;
                }
                let Some(target) = resolve_import(&edge.from, &edge.to, &known) else {
                    debug!(file = %edge.from, import = %edge.to, "unresolved import");
                    continue;
                };
                if target == edge.from {
                    continue;
                }
                if graph
                    .importers
                    .entry(target)
                    .or_default()
                    .insert(edge.from.clone())
                {
                    graph.edges += 1;
                }
            }
        }
        Ok(graph)
    }

    fn report(graph: &Graph) -> FlowReport {
        let chains = detect_chains(graph);
        debug!(
            files = graph.capabilities.len(),
            edges = graph.edges,
            chains = chains.len(),
            "flow analysis finished"
        );
        FlowReport {
            findings: chains.iter().map(FlowChain::to_finding).collect(),
            chains,
            files_analyzed: graph.capabilities.len(),
            edges: graph.edges,
        }
    }
}

fn detect_chains(graph: &Graph) -> Vec<FlowChain> {
    let empty = Capabilities::default();
    let caps = |file: &str| graph.capabilities.get(file).unwrap_or(&empty);
    let no_importers = BTreeSet::new();
    let importers_of = |file: &str| graph.importers.get(file).unwrap_or(&no_importers);

    let mut seen = BTreeSet::new();
    let mut chains = Vec::new();
    let mut push = |chain: FlowChain| {
        if seen.insert(chain.signature()) {
            chains.push(chain);
        }
    };

    for (target, importers) in &graph.importers {
        let source = caps(target);
        for importer in importers {
            let mid = caps(importer);

            if source.reads_credentials() && mid.makes_network_calls() {
                push(FlowChain {
                    kind: ChainKind::CredentialExfiltration,
                    description: format!(
                        "credentials read in {target} reach network calls in {importer}"
                    ),
                    severity: ChainKind::CredentialExfiltration.severity(),
                    files: vec![target.clone(), importer.clone()],
                    steps: vec![
                        source.describe(target, Capability::ReadsCredentials),
                        mid.describe(importer, Capability::MakesNetworkCalls),
                    ],
                });
            }

            if source.reads_credentials() && mid.encodes_data() {
                for downstream in importers_of(importer) {
                    if downstream == target || downstream == importer {
                        continue;
                    }
                    let sink = caps(downstream);
                    if !sink.makes_network_calls() {
                        continue;
                    }
                    push(FlowChain {
                        kind: ChainKind::EncodedExfiltration,
                        description: format!(
                            "credentials read in {target} are encoded in {importer} and sent by {downstream}"
                        ),
                        severity: ChainKind::EncodedExfiltration.severity(),
                        files: vec![target.clone(), importer.clone(), downstream.clone()],
                        steps: vec![
                            source.describe(target, Capability::ReadsCredentials),
                            mid.describe(importer, Capability::EncodesData),
                            sink.describe(downstream, Capability::MakesNetworkCalls),
                        ],
                    });
                }
            }

            if source.executes_code() && mid.makes_network_calls() {
                push(FlowChain {
                    kind: ChainKind::ExecWithNetwork,
                    description: format!(
                        "code execution in {target} is driven by {importer}, which makes network calls"
                    ),
                    severity: ChainKind::ExecWithNetwork.severity(),
                    files: vec![target.clone(), importer.clone()],
                    steps: vec![
                        source.describe(target, Capability::ExecutesCode),
                        mid.describe(importer, Capability::MakesNetworkCalls),
                    ],
                });
            }
        }
    }
    chains
}
