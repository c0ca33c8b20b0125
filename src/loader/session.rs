//! Session lifecycle: output redirection, extension build, hooks, timing.
//!
//! [`SessionManager::load_session`] is the single entry point the host calls
//! at startup and again for every reload. Each call rebuilds the extension
//! descriptors, resynthesizes their modules and reconciles the ribbon; the
//! only error it returns is the fatal bootstrap failure on the first call.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};

use crate::config::LoaderConfig;
use crate::extensions::{DescriptorSource, FsDescriptorSource};
use crate::host::{Host, HostContext, BASE_MODULE_KEY};
use crate::loader::composer::UiComposer;
use crate::loader::dispatch::{EntryPoint, ScriptOutcome, ScriptRunner};
use crate::loader::hooks::{HookContext, HookPoint, LifecycleHooks};
use crate::loader::output::{self, OutputStream};
use crate::loader::registry::ModuleRegistry;
use crate::loader::synthesizer::Synthesizer;
use crate::models::extension::{CommandId, UIExtension};
use crate::models::session::{
    ExtensionFailure, FailureStage, LoadSpeed, LoadedExtension, ModuleStatus, SessionReport,
};
use crate::version;
use crate::{AppError, Result};

/// Owns the host, the module registry and the ribbon reconciler for the
/// lifetime of the process.
pub struct SessionManager<H: Host> {
    host: H,
    config: LoaderConfig,
    source: Box<dyn DescriptorSource>,
    registry: ModuleRegistry,
    composer: UiComposer,
    hooks: LifecycleHooks,
    runner: ScriptRunner,
    loads: u32,
}

impl<H: Host> SessionManager<H> {
    /// Manager reading extensions from disk.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Descriptor` if the configured script patterns are
    /// invalid.
    pub fn new(host: H, config: LoaderConfig) -> Result<Self> {
        let source = FsDescriptorSource::from_config(&config.scripts)?;
        Ok(Self::with_source(host, config, Box::new(source)))
    }

    /// Manager reading extensions from a custom descriptor source.
    #[must_use]
    pub fn with_source(host: H, config: LoaderConfig, source: Box<dyn DescriptorSource>) -> Self {
        let runner = ScriptRunner::from_config(&config.scripts);
        Self {
            host,
            config,
            source,
            registry: ModuleRegistry::new(),
            composer: UiComposer::new(),
            hooks: LifecycleHooks::new(),
            runner,
            loads: 0,
        }
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Installed modules.
    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Interpreter settings used by entry points.
    #[must_use]
    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    /// Lifecycle hooks, for registration.
    pub fn hooks_mut(&mut self) -> &mut LifecycleHooks {
        &mut self.hooks
    }

    /// Number of completed loads.
    #[must_use]
    pub fn loads(&self) -> u32 {
        self.loads
    }

    /// Load (or reload) the session.
    ///
    /// Per-extension failures are logged as critical and recorded in the
    /// report; they never abort the load.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Bootstrap` if output redirection is required but
    /// the base support module is missing or the host cannot create the
    /// output window.
    pub fn load_session(&mut self) -> Result<SessionReport> {
        let started = Instant::now();
        let mut report = SessionReport::new(self.loads + 1);
        let span = info_span!(
            "load_session",
            session_id = %report.session_id,
            load_number = report.load_number,
        );
        let _guard = span.enter();

        report.redirected_output = self.setup_output_window()?;
        self.loads += 1;

        self.report_env();
        self.new_session(&mut report);
        self.run_hooks(&mut report);

        let elapsed = started.elapsed();
        let threshold = self.config.session.slow_load_threshold();
        report.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        report.speed = LoadSpeed::classify(elapsed, threshold);

        let seconds = elapsed.as_secs_f64();
        match report.speed {
            LoadSpeed::Fast => info!(
                elapsed_ms = report.elapsed_ms,
                loaded = report.loaded.len(),
                failed = report.failures.len(),
                "Load time: {seconds:.2} seconds"
            ),
            LoadSpeed::Slow => warn!(
                elapsed_ms = report.elapsed_ms,
                threshold_ms = self.config.session.slow_load_threshold_ms,
                loaded = report.loaded.len(),
                failed = report.failures.len(),
                "Load time: {seconds:.2} seconds, slower than expected"
            ),
        }

        Ok(report)
    }

    /// Entry point currently bound to the ribbon button for `command`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no button is bound to `command` or
    /// the button's binding no longer resolves.
    pub fn entry_point(&self, command: &CommandId) -> Result<EntryPoint> {
        let ui = self.host.ui();
        let binding = ui
            .managed_paths()
            .iter()
            .filter_map(|path| ui.find(path))
            .find_map(|element| {
                element
                    .spec
                    .binding
                    .filter(|binding| &binding.command == command)
            })
            .ok_or_else(|| AppError::NotFound(format!("no button bound to command {command}")))?;
        self.registry.resolve(&binding).cloned()
    }

    /// Press the button for `command`: resolve its entry point and run it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the command is not bound. Script
    /// failures are reported through the outcome instead.
    pub async fn invoke(
        &self,
        command: &CommandId,
        context: &HostContext,
        cancel: &CancellationToken,
    ) -> Result<ScriptOutcome> {
        let entry_point = self.entry_point(command)?;
        Ok(entry_point.invoke(&self.runner, context, cancel).await)
    }

    /// Redirect output into a host window unless one already exists.
    ///
    /// Returns whether this call installed the redirection.
    fn setup_output_window(&mut self) -> Result<bool> {
        if let Some(handle) = output::window_handle() {
            debug!(%handle, "output window already exists, keeping redirection");
            return Ok(false);
        }

        let Some(base) = self.host.find_loaded_module(BASE_MODULE_KEY) else {
            error!(
                severity = "critical",
                key = BASE_MODULE_KEY,
                "base support module is not loaded, cannot create output window"
            );
            return Err(AppError::Bootstrap(format!(
                "base module {BASE_MODULE_KEY} is not loaded"
            )));
        };

        let window = self.host.create_output_window().map_err(|err| {
            error!(severity = "critical", %err, "failed to create output window");
            AppError::Bootstrap(format!("failed to create output window: {err}"))
        })?;

        let stream = OutputStream::new(window);
        let handle = stream.handle();
        output::install(stream);
        info!(%handle, module = %base, "output redirected to host window");
        Ok(true)
    }

    fn report_env(&self) {
        let base_module = self
            .host
            .find_loaded_module(BASE_MODULE_KEY)
            .map_or_else(|| "not loaded".to_owned(), |module| module.to_string());
        let config_file = self
            .config
            .config_file
            .as_ref()
            .map_or_else(|| "built-in defaults".to_owned(), |p| p.display().to_string());

        info!(
            version = %version::formatted(),
            runtime = %version::runtime(),
            interpreter = %self.config.scripts.interpreter,
            home = %self.config.home_dir.display(),
            base_module = %base_module,
            config_file = %config_file,
            "loader environment"
        );
    }

    fn new_session(&mut self, report: &mut SessionReport) {
        let roots = self.config.ext_root_dirs();
        self.composer.begin_session();

        let library_paths: Vec<PathBuf> = roots
            .iter()
            .flat_map(|root| self.source.library_extensions(root))
            .collect();
        if !library_paths.is_empty() {
            debug!(count = library_paths.len(), "library extensions found");
        }
        let synthesizer = Synthesizer::with_library_paths(library_paths);

        let mut seen = HashSet::new();
        let mut live = HashSet::new();
        for root in &roots {
            let extensions = self.source.installed_extensions(root);
            debug!(root = %root.display(), count = extensions.len(), "extensions discovered");
            for extension in &extensions {
                self.build_extension(&synthesizer, extension, &mut seen, &mut live, report);
            }
        }
        report.roots = roots;

        report.removed_elements = self.composer.cleanup_ui(self.host.ui_mut());
        report.pruned_modules = self.registry.retain_keys(&live);
        debug!(
            removed = report.removed_elements,
            pruned = report.pruned_modules,
            "stale ui and modules cleaned up"
        );
    }

    fn build_extension(
        &mut self,
        synthesizer: &Synthesizer,
        extension: &UIExtension,
        seen: &mut HashSet<String>,
        live: &mut HashSet<String>,
        report: &mut SessionReport,
    ) {
        let key = extension.key();
        if !key.is_empty() && !seen.insert(key.clone()) {
            record_failure(
                report,
                extension,
                FailureStage::Duplicate,
                format!("an extension with identity {key} is already loaded"),
            );
            return;
        }

        let assembly = match synthesizer.synthesize(extension, &mut self.registry) {
            Ok(assembly) => assembly,
            Err(err) => {
                record_failure(report, extension, FailureStage::Synthesis, err.to_string());
                return;
            }
        };

        let stats = match self
            .composer
            .update_ui(self.host.ui_mut(), extension, &assembly)
        {
            Ok(stats) => stats,
            Err(err) => {
                record_failure(report, extension, FailureStage::Composition, err.to_string());
                return;
            }
        };

        let module_status = self.registry.status_of(&key).unwrap_or(ModuleStatus::Fresh);
        info!(
            extension = %extension.name,
            module = %assembly.name,
            commands = assembly.entry_points,
            ?module_status,
            "UI created for extension"
        );
        live.insert(key);
        report.ui += stats;
        report.loaded.push(LoadedExtension {
            name: extension.name.clone(),
            module: assembly.name,
            commands: assembly.entry_points,
            module_status,
        });
    }

    fn run_hooks(&mut self, report: &mut SessionReport) {
        if self.hooks.is_empty() {
            return;
        }
        let mut failed = {
            let ctx = HookContext {
                session_id: &report.session_id,
                load_number: report.load_number,
                loaded: &report.loaded,
            };
            let mut failed = self.hooks.run(HookPoint::SessionLoad, &ctx);
            failed.extend(self.hooks.run(HookPoint::Startup, &ctx));
            failed
        };
        report.failed_hooks.append(&mut failed);
    }
}

fn record_failure(
    report: &mut SessionReport,
    extension: &UIExtension,
    stage: FailureStage,
    reason: String,
) {
    error!(
        severity = "critical",
        extension = %extension.name,
        ?stage,
        %reason,
        "failed to load extension"
    );
    report.failures.push(ExtensionFailure {
        extension: extension.name.clone(),
        stage,
        reason,
    });
}
