use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use autoctl_control::{
	find_service_pid, parse_registry, Control, Kernel, RestartConfirmator, Signaller, StopMode,
};
use autoctl_supervisor::*;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

fn temp_dir(name: &str) -> PathBuf {
	let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = std::env::temp_dir().join(format!("autoctl-sup-test-{}-{}-{}", std::process::id(), n, name));
	let _ = std::fs::remove_dir_all(&dir);
	let _ = std::fs::create_dir_all(&dir);
	dir
}

fn test_supervisor(name: &str, services: Vec<ServiceSpec>) -> (Supervisor, PathBuf) {
	supervisor_with_delay(name, Duration::from_millis(10), services)
}

fn supervisor_with_delay(name: &str, restart_delay: Duration, services: Vec<ServiceSpec>) -> (Supervisor, PathBuf) {
	let registry_path = temp_dir(name).join("pg_autoctl.pid");
	let sup = Supervisor::new(
		SupervisorConfig {
			registry_path: registry_path.clone(),
			restart_delay,
		},
		services,
	);
	(sup, registry_path)
}

async fn wait_for_services(path: &Path, count: usize) -> Vec<(String, i32)> {
	for _ in 0..100 {
		if let Ok(registry) = parse_registry(path) {
			if registry.services.len() == count {
				return registry.services.into_iter().map(|e| (e.name, e.pid)).collect();
			}
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	panic!("registry {} never listed {} services", path.display(), count);
}

#[tokio::test]
async fn supervisor_without_services() {
	let (sup, _) = test_supervisor("empty", vec![]);
	assert!(matches!(sup.run().await, Err(SupervisorError::NoServices)));
}

#[tokio::test]
async fn supervisor_writes_registry_and_removes_it_on_stop() {
	let (sup, path) = test_supervisor(
		"start-stop",
		vec![
			ServiceSpec::shell("postgres", "sleep 60"),
			ServiceSpec::shell("node active", "sleep 60"),
		],
	);
	let handle = sup.handle();
	let running = tokio::spawn(sup.run());

	let services = wait_for_services(&path, 2).await;
	let names: Vec<&str> = services.iter().map(|(n, _)| n.as_str()).collect();
	assert_eq!(names, vec!["postgres", "node active"]);

	let registry = parse_registry(&path).unwrap();
	assert_eq!(registry.supervisor_pid, Some(std::process::id() as i32));
	assert!(registry.sync_object_id.is_some());
	for (_, pid) in &services {
		assert!(Kernel.is_alive(*pid).unwrap());
	}

	handle.stop(StopMode::Fast);
	running.await.unwrap().unwrap();

	assert!(!path.exists());
	tokio::time::sleep(Duration::from_millis(50)).await;
	for (_, pid) in &services {
		assert!(!Kernel.is_alive(*pid).unwrap());
	}
}

#[tokio::test]
async fn supervisor_restarts_terminated_service() {
	let (sup, path) = test_supervisor(
		"restart",
		vec![
			ServiceSpec::shell("postgres", "sleep 60"),
			ServiceSpec::shell("listener", "sleep 60"),
		],
	);
	let handle = sup.handle();
	let running = tokio::spawn(sup.run());
	wait_for_services(&path, 2).await;

	let postgres = find_service_pid(&path, "postgres").unwrap();
	let confirm_path = path.clone();
	let restarted = tokio::task::spawn_blocking(move || {
		RestartConfirmator::new(&confirm_path, Kernel)
			.with_interval(Duration::from_millis(10))
			.restart("listener")
	})
	.await
	.unwrap()
	.unwrap();

	assert_ne!(restarted.old_pid, restarted.new_pid);
	assert!(Kernel.is_alive(restarted.new_pid).unwrap());
	assert_eq!(find_service_pid(&path, "postgres").unwrap(), postgres);

	handle.stop(StopMode::Graceful);
	running.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn restart_confirmed_across_default_restart_delay() {
	let (sup, path) = supervisor_with_delay(
		"restart-default-delay",
		Duration::from_millis(500),
		vec![
			ServiceSpec::shell("postgres", "sleep 60"),
			ServiceSpec::shell("listener", "sleep 60"),
		],
	);
	let handle = sup.handle();
	let running = tokio::spawn(sup.run());
	wait_for_services(&path, 2).await;

	let confirm_path = path.clone();
	let restarted = tokio::task::spawn_blocking(move || {
		RestartConfirmator::new(&confirm_path, Kernel).restart("listener")
	})
	.await
	.unwrap()
	.unwrap();

	assert_eq!(restarted.service, "listener");
	assert_ne!(restarted.old_pid, restarted.new_pid);
	assert_eq!(find_service_pid(&path, "listener").unwrap(), restarted.new_pid);

	handle.stop(StopMode::Graceful);
	running.await.unwrap().unwrap();
}

#[tokio::test]
async fn terminated_service_keeps_its_registry_line_until_relaunched() {
	let (sup, path) = supervisor_with_delay(
		"restart-keeps-line",
		Duration::from_millis(500),
		vec![ServiceSpec::shell("listener", "sleep 60")],
	);
	let handle = sup.handle();
	let running = tokio::spawn(sup.run());
	let old_pid = wait_for_services(&path, 1).await[0].1;

	Kernel.send(old_pid, Control::RestartService).unwrap();
	tokio::time::sleep(Duration::from_millis(150)).await;
	// still inside the restart delay
	assert_eq!(find_service_pid(&path, "listener").unwrap(), old_pid);

	handle.stop(StopMode::Fast);
	running.await.unwrap().unwrap();
}

#[tokio::test]
async fn supervisor_restarts_service_that_exits_on_its_own() {
	let (sup, path) = test_supervisor("exits", vec![ServiceSpec::shell("listener", "sleep 0.1")]);
	let handle = sup.handle();
	let running = tokio::spawn(sup.run());

	let first = wait_for_services(&path, 1).await[0].1;
	let mut replaced = false;
	for _ in 0..100 {
		if let Ok(pid) = find_service_pid(&path, "listener") {
			if pid != first {
				replaced = true;
				break;
			}
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	assert!(replaced, "listener was never relaunched");

	handle.stop(StopMode::Immediate);
	running.await.unwrap().unwrap();
}

#[tokio::test]
async fn supervisor_spawn_failure_is_fatal() {
	let (sup, path) = test_supervisor(
		"spawn-failure",
		vec![
			ServiceSpec::shell("postgres", "sleep 60"),
			ServiceSpec::new("listener", "/nonexistent/pg_autoctl-listener"),
		],
	);
	match sup.run().await {
		Err(SupervisorError::Spawn { service, .. }) => assert_eq!(service, "listener"),
		other => panic!("expected Spawn error, got {:?}", other),
	}
	assert!(!path.exists());
}

#[tokio::test]
async fn supervisor_reload_keeps_services() {
	let (sup, path) = test_supervisor(
		"reload",
		vec![ServiceSpec::new("postgres", "sh").args(["-c", "trap '' HUP; exec sleep 60"])],
	);
	let handle = sup.handle();
	let running = tokio::spawn(sup.run());
	let before = wait_for_services(&path, 1).await;

	handle.reload();
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(wait_for_services(&path, 1).await, before);

	handle.stop(StopMode::Graceful);
	running.await.unwrap().unwrap();
}
