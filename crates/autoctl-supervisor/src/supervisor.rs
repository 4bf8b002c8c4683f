use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::process::{Child, Command};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};

use autoctl_control::{deliver_signal, write_registry, ProcessRegistry, ServiceEntry, StopMode};

use crate::error::SupervisorError;
use crate::types::*;

pub struct SupervisorConfig {
	pub registry_path: PathBuf,
	/// Pause between a service terminating and its relaunch.
	pub restart_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorCommand {
	Stop(StopMode),
	Reload,
}

/// Sends the supervisor what a signal would, from inside the process.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
	commands: mpsc::UnboundedSender<SupervisorCommand>,
}

impl SupervisorHandle {
	pub fn stop(&self, mode: StopMode) {
		let _ = self.commands.send(SupervisorCommand::Stop(mode));
	}

	pub fn reload(&self) {
		let _ = self.commands.send(SupervisorCommand::Reload);
	}
}

pub struct Supervisor {
	config: SupervisorConfig,
	services: Vec<ServiceSpec>,
	commands: mpsc::UnboundedSender<SupervisorCommand>,
	inbox: mpsc::UnboundedReceiver<SupervisorCommand>,
}

impl Supervisor {
	pub fn new(config: SupervisorConfig, services: Vec<ServiceSpec>) -> Self {
		let (commands, inbox) = mpsc::unbounded_channel();
		Self { config, services, commands, inbox }
	}

	pub fn handle(&self) -> SupervisorHandle {
		SupervisorHandle { commands: self.commands.clone() }
	}

	/// Runs every service until a stop request, then removes the registry.
	pub async fn run(self) -> Result<(), SupervisorError> {
		let Supervisor { config, services, commands, inbox } = self;

		if services.is_empty() {
			return Err(SupervisorError::NoServices);
		}

		let mut control = ControlSignals::new(inbox)?;
		// held so the inbox stays open for handles created later
		let _commands = commands;

		let table = Arc::new(Mutex::new(RegistryTable {
			path: config.registry_path.clone(),
			supervisor_pid: std::process::id() as i32,
			sync_object_id: nix::unistd::getpgrp().as_raw().to_string(),
			slots: services
				.iter()
				.map(|s| Slot { name: s.name.clone(), state: ProcessState::Stopped })
				.collect(),
		}));
		lock(&table).flush().map_err(|e| SupervisorError::Registry {
			path: config.registry_path.clone(),
			source: e,
		})?;

		tracing::info!(
			"pg_autoctl supervisor started with pid {}, pid file \"{}\"",
			std::process::id(),
			config.registry_path.display()
		);

		let (stop_tx, stop_rx) = watch::channel(None);
		let mut loops = JoinSet::new();
		for (index, spec) in services.into_iter().enumerate() {
			loops.spawn(run_service_loop(
				Arc::clone(&table),
				index,
				spec,
				config.restart_delay,
				stop_rx.clone(),
			));
		}

		let outcome = loop {
			tokio::select! {
				command = control.recv() => match command {
					SupervisorCommand::Stop(mode) => {
						tracing::info!("Received {}, stopping all services", mode.signal());
						stop_tx.send_replace(Some(mode));
						break Ok(());
					}
					SupervisorCommand::Reload => reload_services(&table),
				},
				Some(joined) = loops.join_next() => {
					if let Some(err) = service_failure(joined) {
						tracing::error!("{}, stopping all services", err);
						stop_tx.send_replace(Some(StopMode::Graceful));
						break Err(err);
					}
				}
			}
		};

		// a later, harder stop request is passed on while waiting
		loop {
			tokio::select! {
				joined = loops.join_next() => match joined {
					None => break,
					Some(joined) => {
						if let Some(err) = service_failure(joined) {
							tracing::warn!("{}", err);
						}
					}
				},
				command = control.recv() => {
					if let SupervisorCommand::Stop(mode) = command {
						tracing::info!("Received {} while stopping", mode.signal());
						stop_tx.send_replace(Some(mode));
					}
				}
			}
		}

		if let Err(e) = std::fs::remove_file(&config.registry_path) {
			if e.kind() != std::io::ErrorKind::NotFound {
				tracing::warn!(
					"Failed to remove pid file \"{}\": {}",
					config.registry_path.display(),
					e
				);
			}
		}
		tracing::info!("pg_autoctl supervisor stopped");

		outcome
	}
}

struct ControlSignals {
	sigterm: tokio::signal::unix::Signal,
	sigint: tokio::signal::unix::Signal,
	sigquit: tokio::signal::unix::Signal,
	sighup: tokio::signal::unix::Signal,
	inbox: mpsc::UnboundedReceiver<SupervisorCommand>,
}

impl ControlSignals {
	fn new(inbox: mpsc::UnboundedReceiver<SupervisorCommand>) -> Result<Self, SupervisorError> {
		Ok(Self {
			sigterm: signal(SignalKind::terminate()).map_err(SupervisorError::Signals)?,
			sigint: signal(SignalKind::interrupt()).map_err(SupervisorError::Signals)?,
			sigquit: signal(SignalKind::quit()).map_err(SupervisorError::Signals)?,
			sighup: signal(SignalKind::hangup()).map_err(SupervisorError::Signals)?,
			inbox,
		})
	}

	async fn recv(&mut self) -> SupervisorCommand {
		tokio::select! {
			_ = self.sigterm.recv() => SupervisorCommand::Stop(StopMode::Graceful),
			_ = self.sigint.recv() => SupervisorCommand::Stop(StopMode::Fast),
			_ = self.sigquit.recv() => SupervisorCommand::Stop(StopMode::Immediate),
			_ = self.sighup.recv() => SupervisorCommand::Reload,
			Some(command) = self.inbox.recv() => command,
		}
	}
}

struct Slot {
	name: String,
	state: ProcessState,
}

/// In-memory view of the registry; every change rewrites the whole file.
struct RegistryTable {
	path: PathBuf,
	supervisor_pid: i32,
	sync_object_id: String,
	slots: Vec<Slot>,
}

impl RegistryTable {
	fn flush(&self) -> std::io::Result<()> {
		let mut registry = ProcessRegistry::new(self.supervisor_pid, self.sync_object_id.clone());
		registry.services = self
			.slots
			.iter()
			.filter_map(|slot| {
				slot.state
					.registered_pid()
					.map(|pid| ServiceEntry { pid: pid as i32, name: slot.name.clone() })
			})
			.collect();
		write_registry(&self.path, &registry)
	}

	fn update(&mut self, index: usize, state: ProcessState) {
		self.slots[index].state = state;
		if let Err(e) = self.flush() {
			tracing::error!("Failed to write pid file \"{}\": {}", self.path.display(), e);
		}
	}

	fn running(&self) -> Vec<(String, u32)> {
		self.slots
			.iter()
			.filter_map(|slot| slot.state.pid().map(|pid| (slot.name.clone(), pid)))
			.collect()
	}
}

fn lock(table: &Mutex<RegistryTable>) -> MutexGuard<'_, RegistryTable> {
	table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn reload_services(table: &Mutex<RegistryTable>) {
	let running = lock(table).running();
	for (name, pid) in running {
		tracing::info!("Sending SIGHUP to service \"{}\" with pid {}", name, pid);
		if let Err(e) = deliver_signal(pid as i32, Some(Signal::SIGHUP)) {
			tracing::warn!("Failed to reload service \"{}\": {}", name, e);
		}
	}
}

fn service_failure(joined: Result<Result<(), SupervisorError>, JoinError>) -> Option<SupervisorError> {
	match joined {
		Ok(Ok(())) => None,
		Ok(Err(e)) => Some(e),
		Err(e) => Some(SupervisorError::Task(e)),
	}
}

async fn run_service_loop(
	table: Arc<Mutex<RegistryTable>>,
	index: usize,
	spec: ServiceSpec,
	restart_delay: Duration,
	mut stop: watch::Receiver<Option<StopMode>>,
) -> Result<(), SupervisorError> {
	let mut restarts: u32 = 0;
	let mut last_pid: Option<u32> = None;

	loop {
		if stop.borrow().is_some() {
			lock(&table).update(index, ProcessState::Stopped);
			return Ok(());
		}

		let mut child = spawn_service(&spec).map_err(|e| SupervisorError::Spawn {
			service: spec.name.clone(),
			source: e,
		})?;

		last_pid = child.id().or(last_pid);
		if let Some(pid) = child.id() {
			tracing::info!("Started pg_autoctl {} service with pid {}", spec.name, pid);
			lock(&table).update(index, ProcessState::Running { pid, restarts });

			tokio::select! {
				status = child.wait() => match status {
					Ok(status) => tracing::warn!(
						"Service \"{}\" with pid {} terminated ({}), restarting",
						spec.name,
						pid,
						status
					),
					Err(e) => tracing::error!("Failed to wait for service \"{}\": {}", spec.name, e),
				},
				_ = stop.changed() => {
					stop_service(&spec.name, pid, &mut child, &mut stop).await;
					lock(&table).update(index, ProcessState::Stopped);
					return Ok(());
				}
			}
		}

		restarts += 1;
		lock(&table).update(index, ProcessState::Restarting { last_pid, restarts });

		tokio::select! {
			_ = tokio::time::sleep(restart_delay) => {}
			_ = stop.changed() => {}
		}
	}
}

/// Signals the service with the requested stop mode, again each time the mode changes, until it exits.
async fn stop_service(
	name: &str,
	pid: u32,
	child: &mut Child,
	stop: &mut watch::Receiver<Option<StopMode>>,
) {
	loop {
		let mode = stop.borrow_and_update().unwrap_or_default();
		tracing::info!("Sending {} to service \"{}\" with pid {}", mode.signal(), name, pid);
		if let Err(e) = deliver_signal(pid as i32, Some(mode.signal())) {
			tracing::debug!("Failed to signal service \"{}\": {}", name, e);
		}

		tokio::select! {
			status = child.wait() => {
				match status {
					Ok(status) => tracing::info!("Service \"{}\" with pid {} stopped ({})", name, pid, status),
					Err(e) => tracing::warn!("Failed to wait for service \"{}\": {}", name, e),
				}
				return;
			}
			changed = stop.changed() => {
				if changed.is_err() {
					let _ = child.wait().await;
					return;
				}
			}
		}
	}
}

fn spawn_service(spec: &ServiceSpec) -> std::io::Result<Child> {
	let mut cmd = Command::new(&spec.program);
	cmd.args(&spec.args)
		.stdin(Stdio::null())
		.stdout(Stdio::inherit())
		.stderr(Stdio::inherit())
		.process_group(0);

	for (key, val) in &spec.env {
		cmd.env(key, val);
	}

	cmd.spawn()
}
