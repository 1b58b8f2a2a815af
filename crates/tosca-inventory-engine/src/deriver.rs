//! Derivation pass: compile every service, filter its node instances, group them.
//!
//! Compilation failures are collected rather than raised mid-pass: every
//! descriptor is attempted (unless `fail_fast` is set), groups filled by the
//! descriptors that did compile stay intact, and the caller decides what to do
//! with the failures via `Derivation::into_result`.

use crate::assembly::{GroupAssembler, GroupId};
use crate::emitter::InventoryEmitter;
use crate::filter::TypeFilter;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tosca_inventory_core::{
    CompilationFailure, CompileError, DeriveOptions, Error, InventorySource, Result,
    ServiceDescriptor,
};
use tosca_inventory_graph::{create_compiler, inspect, CompiledGraph, Compiler};
use tracing::{debug, info, warn};

/// What one service contributed to the pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceReport {
    pub index: usize,
    pub service: Option<String>,
    pub template: String,
    pub group: String,
    /// Vertices of any kind.
    pub vertices: usize,
    pub node_instances: usize,
    pub matched: usize,
    /// Node instances skipped because their metadata was malformed.
    pub skipped: usize,
}

impl ServiceReport {
    fn new(index: usize, service: &ServiceDescriptor, group: &str) -> Self {
        Self {
            index,
            service: service.name.clone(),
            template: service.template.clone(),
            group: group.to_string(),
            ..Default::default()
        }
    }
}

/// Result of a pass: the assembled groups plus what happened per service.
#[derive(Debug, Default)]
pub struct Derivation {
    pub groups: GroupAssembler,
    pub reports: Vec<ServiceReport>,
    pub failures: Vec<CompilationFailure>,
}

impl Derivation {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The assembled groups, or every compilation failure if there were any.
    pub fn into_result(self) -> Result<GroupAssembler> {
        let mut failures = self.failures;
        match failures.len() {
            0 => Ok(self.groups),
            1 => Err(Error::Compilation(failures.remove(0))),
            _ => Err(Error::CompilationFailed(failures)),
        }
    }

    pub fn emit<E: InventoryEmitter>(&self, emitter: &mut E) -> Result<()> {
        self.groups.emit(emitter)
    }
}

/// Add every conforming node instance of `graph` to `group`.
///
/// Vertices that are not node instances are ignored. Node instances with
/// malformed metadata are skipped and reported; they never abort the pass.
pub fn assemble_graph(
    groups: &mut GroupAssembler,
    group: GroupId,
    graph: &dyn CompiledGraph,
    filter: &TypeFilter,
    report: &mut ServiceReport,
) {
    for vertex in graph.vertices() {
        report.vertices += 1;
        match inspect(vertex) {
            Ok(None) => {
                debug!(vertex = vertex.id(), kind = %vertex.kind(), "ignoring vertex");
            }
            Ok(Some(node)) => {
                report.node_instances += 1;
                if filter.allows(&node) {
                    groups.add_host(group, node.name);
                    report.matched += 1;
                }
            }
            Err(e) => {
                warn!(template = %report.template, error = %e, "skipping malformed vertex");
                report.skipped += 1;
            }
        }
    }
}

pub struct Deriver {
    compiler: Arc<dyn Compiler>,
    options: DeriveOptions,
}

impl Deriver {
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self {
            compiler,
            options: DeriveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DeriveOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a deriver with the compiler and options the source document asks for.
    pub fn from_source(source: &InventorySource) -> Result<Self> {
        let compiler = create_compiler(&source.compiler, &source.options)?;
        Ok(Self::new(compiler).with_options(source.options.clone()))
    }

    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    /// Run one derivation pass over `services`, in the order given.
    pub async fn derive(&self, services: &[ServiceDescriptor]) -> Derivation {
        let derivation = if self.options.parallel {
            self.derive_concurrent(services).await
        } else {
            self.derive_sequential(services).await
        };

        info!(
            services = services.len(),
            groups = derivation.groups.len(),
            failed = derivation.failures.len(),
            "derivation complete"
        );
        derivation
    }

    async fn derive_sequential(&self, services: &[ServiceDescriptor]) -> Derivation {
        let mut derivation = Derivation::default();

        for (index, service) in services.iter().enumerate() {
            let group = derivation.groups.target_group(service);
            let mut report = ServiceReport::new(index, service, &derivation.groups.group(group).name);

            match self.compile(index, service).await {
                Ok(graph) => {
                    let filter = TypeFilter::for_service(service);
                    assemble_graph(&mut derivation.groups, group, graph.as_ref(), &filter, &mut report);
                    log_report(&report);
                    derivation.reports.push(report);
                }
                Err(failure) => {
                    derivation.failures.push(failure);
                    if self.options.fail_fast {
                        break;
                    }
                }
            }
        }
        derivation
    }

    /// Compile all services concurrently. Target groups are created up front,
    /// in configuration order, so the group structure does not depend on which
    /// compilation finishes first. Under `fail_fast` this means groups of
    /// cancelled services still exist, empty, unlike the sequential pass.
    async fn derive_concurrent(&self, services: &[ServiceDescriptor]) -> Derivation {
        let shared = Mutex::new(GroupAssembler::new());
        let mut targets = Vec::with_capacity(services.len());
        {
            let mut groups = shared.lock().await;
            for service in services {
                let id = groups.target_group(service);
                targets.push((id, groups.group(id).name.clone()));
            }
        }

        let shared = &shared;
        let mut pending: FuturesUnordered<_> = services
            .iter()
            .zip(targets)
            .enumerate()
            .map(|(index, (service, (group, group_name)))| async move {
                let mut report = ServiceReport::new(index, service, &group_name);
                let graph = self.compile(index, service).await?;
                let filter = TypeFilter::for_service(service);
                let mut groups = shared.lock().await;
                assemble_graph(&mut groups, group, graph.as_ref(), &filter, &mut report);
                Ok::<_, CompilationFailure>(report)
            })
            .collect();

        let mut reports = Vec::new();
        let mut failures = Vec::new();
        while let Some(outcome) = pending.next().await {
            match outcome {
                Ok(report) => {
                    log_report(&report);
                    reports.push(report);
                }
                Err(failure) => {
                    failures.push(failure);
                    if self.options.fail_fast {
                        break;
                    }
                }
            }
        }
        // Dropping the remaining futures cancels their compilations.
        drop(pending);

        reports.sort_by_key(|r| r.index);
        failures.sort_by_key(|f| f.index);
        let groups = std::mem::take(&mut *shared.lock().await);
        Derivation {
            groups,
            reports,
            failures,
        }
    }

    async fn compile(
        &self,
        index: usize,
        service: &ServiceDescriptor,
    ) -> std::result::Result<Box<dyn CompiledGraph>, CompilationFailure> {
        info!(index, service = ?service.name, template = %service.template, "compiling template");
        self.compiler
            .compile(&service.template, &service.inputs)
            .await
            .map_err(|error| failure(index, service, error))
    }
}

fn failure(index: usize, service: &ServiceDescriptor, error: CompileError) -> CompilationFailure {
    warn!(index, template = %service.template, error = %error, "compilation failed");
    for problem in &error.problems {
        warn!(template = %service.template, "{}", problem);
    }
    CompilationFailure {
        index,
        service: service.name.clone(),
        template: service.template.clone(),
        error,
    }
}

fn log_report(report: &ServiceReport) {
    info!(
        group = %report.group,
        template = %report.template,
        vertices = report.vertices,
        matched = report.matched,
        skipped = report.skipped,
        "service assembled"
    );
}
