//! Integration tests for the client crate, run against the in-process bus

use pkc_bus::memory::MemoryBus;
use pkc_bus::EventChannel;
use pkc_client::{
    Capture, Command, Console, Outcome, ProgressRenderer, Resolver, ScriptedPrompt,
    TransactionContext, TransactionContextBuilder,
};
use pkc_errors::{BusError, Error, TransactionError};
use pkc_events::{ServiceEvent, SignatureRequired};
use pkc_types::{
    ErrorKind, ExitReason, FilterSet, InfoKind, NetworkState, OperationRequest, PackageId,
    PackageItem, Percentage, ProgressSnapshot, Role, SigType,
};
use std::sync::Arc;
use std::time::Duration;

// Test helper functions

struct Harness {
    bus: Arc<MemoryBus>,
    prompt: ScriptedPrompt,
    out: Capture,
    err: Capture,
    ctx: TransactionContext,
}

async fn harness(bus: MemoryBus, answers: &[&str], interactive: bool) -> Harness {
    let bus = Arc::new(bus);
    let prompt = ScriptedPrompt::new(answers.iter().copied());
    let out = Capture::new();
    let err = Capture::new();
    let console = Console::new(
        Box::new(out.clone()),
        Box::new(err.clone()),
        ProgressRenderer::new(15, interactive),
        false,
    );
    let ctx = TransactionContextBuilder::new()
        .with_bus(bus.clone())
        .with_console(console)
        .with_prompt(Box::new(prompt.clone()))
        .build()
        .await
        .unwrap();
    Harness {
        bus,
        prompt,
        out,
        err,
        ctx,
    }
}

fn id(raw: &str) -> PackageId {
    PackageId::parse(raw).unwrap()
}

fn package(info: InfoKind, raw: &str) -> ServiceEvent {
    ServiceEvent::Package(PackageItem {
        info,
        package_id: id(raw),
        summary: String::new(),
    })
}

fn finished(exit: ExitReason) -> ServiceEvent {
    ServiceEvent::finished(exit, Duration::from_millis(1500))
}

fn progress(percentage: u32, subpercentage: u32) -> ServiceEvent {
    ServiceEvent::Progress(ProgressSnapshot::new(
        Percentage::from_raw(percentage),
        Percentage::from_raw(subpercentage),
    ))
}

fn signature_required(package_id: &str) -> ServiceEvent {
    ServiceEvent::RepoSignatureRequired(SignatureRequired {
        package_id: id(package_id),
        repository_name: "updates".into(),
        key_url: "https://keys.example.org/updates.asc".into(),
        key_userid: "Updates <keys@example.org>".into(),
        key_id: "BEEF0042".into(),
        key_fingerprint: "0123 4567 89AB CDEF BEEF 0042".into(),
        key_timestamp: "2026-01-01".into(),
        sig_type: SigType::Gpg,
    })
}

#[tokio::test]
async fn test_multiple_candidates_pick_second() {
    let bus = MemoryBus::default();
    bus.script(
        Role::Resolve,
        vec![
            package(InfoKind::Available, "firefox;120.0;x86_64;fedora"),
            package(InfoKind::Available, "firefox;121.0;x86_64;updates"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &["2"], false).await;

    let outcome = Command::Install {
        package: "firefox".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Finished(ExitReason::Success));
    assert_eq!(
        h.bus.started(),
        vec![
            OperationRequest::resolve(FilterSet::not_installed(), "firefox"),
            OperationRequest::install(id("firefox;121.0;x86_64;updates")),
        ]
    );
    assert_eq!(h.prompt.asked(), vec!["Please enter the package number: "]);
    assert!(h.out.contents().contains(
        "There are multiple matches\n\
         1. firefox;120.0;x86_64;fedora\n\
         2. firefox;121.0;x86_64;updates\n"
    ));
}

#[tokio::test]
async fn test_resolve_lists_every_match_without_asking() {
    let bus = MemoryBus::default();
    bus.script(
        Role::Resolve,
        vec![
            package(InfoKind::Available, "firefox;120.0;x86_64;fedora"),
            package(InfoKind::Available, "firefox;121.0;x86_64;updates"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &[], false).await;

    let outcome = Command::Resolve {
        package: "firefox".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        h.bus.started(),
        vec![OperationRequest::resolve(FilterSet::none(), "firefox")]
    );
    assert!(h.prompt.asked().is_empty());
    let out = h.out.contents();
    assert!(out.contains("firefox-120.0"));
    assert!(out.contains("firefox-121.0"));
    assert!(!out.contains("There are multiple matches"));
}

#[tokio::test]
async fn test_invalid_pick_is_asked_again() {
    let bus = MemoryBus::default();
    bus.script(
        Role::Resolve,
        vec![
            package(InfoKind::Installed, "vim;9.0;x86_64;installed"),
            package(InfoKind::Installed, "vim;9.0;i686;installed"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &["7", "x", "1"], false).await;

    Command::Remove {
        package: "vim".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(h.prompt.asked().len(), 3);
    assert_eq!(
        h.prompt.asked()[1],
        "Please enter a number from 1 to 2: "
    );
    let removed = h.bus.started().pop().unwrap();
    assert_eq!(removed, OperationRequest::remove(id("vim;9.0;x86_64;installed"), false));
}

#[tokio::test]
async fn test_single_provider_is_selected_without_prompt() {
    let bus = MemoryBus::default();
    bus.script(Role::Resolve, vec![finished(ExitReason::Success)]);
    bus.script(
        Role::WhatProvides,
        vec![
            package(InfoKind::Available, "gstreamer1-plugins-ugly;1.22;x86_64;fedora"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &[], false).await;

    Command::Install {
        package: "mp3-codec".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert!(h.prompt.asked().is_empty());
    let started = h.bus.started();
    assert_eq!(started.len(), 3);
    assert_eq!(started[1].role, Role::WhatProvides);
    assert_eq!(
        started[2],
        OperationRequest::install(id("gstreamer1-plugins-ugly;1.22;x86_64;fedora"))
    );
}

#[tokio::test]
async fn test_no_match_reports_per_command_message() {
    let bus = MemoryBus::default();
    bus.script(Role::Resolve, vec![finished(ExitReason::Success)]);
    bus.script(Role::WhatProvides, vec![finished(ExitReason::Success)]);
    let mut h = harness(bus, &[], false).await;

    let err = Command::Install {
        package: "nothing-by-this-name".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Resolve(_)));
    assert_eq!(
        h.err.contents(),
        "Could not find a package with that name to install, or package already installed\n"
    );
    assert!(h
        .bus
        .started()
        .iter()
        .all(|request| request.role != Role::InstallPackage));
}

#[tokio::test]
async fn test_canonical_input_makes_no_bus_calls() {
    let mut h = harness(MemoryBus::default(), &[], false).await;
    let before = h.bus.calls().len();

    let mut resolver = Resolver::new();
    let resolved = resolver
        .resolve(&mut h.ctx, "vim;9.0;x86_64;fedora", FilterSet::installed())
        .await
        .unwrap();

    assert_eq!(resolved, id("vim;9.0;x86_64;fedora"));
    assert_eq!(h.bus.calls().len(), before);
    assert!(resolver.lookup().is_none());
}

#[tokio::test]
async fn test_offline_install_never_starts() {
    let bus = MemoryBus::default();
    bus.set_network(NetworkState::Offline);
    let mut h = harness(bus, &[], false).await;

    let err = Command::Install {
        package: "vim;9.0;x86_64;fedora".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Bus(BusError::Offline { .. })));
    assert!(h.bus.started().is_empty());
}

#[tokio::test]
async fn test_unsupported_role_never_starts() {
    let bus = MemoryBus::with_roles([Role::Resolve, Role::GetPackages]);
    let mut h = harness(bus, &[], false).await;

    let err = Command::RepoEnable {
        repo_id: "updates-testing".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Bus(BusError::UnsupportedOperation { .. })
    ));
    assert!(h.bus.started().is_empty());
}

#[tokio::test]
async fn test_remove_with_dependents_declined() {
    let bus = MemoryBus::default();
    bus.script(
        Role::GetRequires,
        vec![
            package(InfoKind::Installed, "bash;5.2;x86_64;installed"),
            package(InfoKind::Installed, "coreutils;9.3;x86_64;installed"),
            package(InfoKind::Installed, "systemd;254;x86_64;installed"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &["n"], false).await;

    let err = Command::Remove {
        package: "glibc;2.38;x86_64;installed".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Transaction(TransactionError::UserDeclined)
    ));
    assert_eq!(
        h.prompt.asked(),
        vec!["Okay to remove additional packages? [N/y] "]
    );
    assert!(h.out.contents().contains(
        "The following packages have to be removed:\n\
         0\tbash-5.2\n\
         1\tcoreutils-9.3\n\
         2\tsystemd-254\n"
    ));
    assert!(h
        .bus
        .started()
        .iter()
        .all(|request| request.role != Role::RemovePackage));
}

#[tokio::test]
async fn test_remove_with_dependents_accepted() {
    let bus = MemoryBus::default();
    bus.script(
        Role::GetRequires,
        vec![
            package(InfoKind::Installed, "bash;5.2;x86_64;installed"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &["y"], false).await;

    Command::Remove {
        package: "glibc;2.38;x86_64;installed".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    let started = h.bus.started();
    assert_eq!(
        started[0],
        OperationRequest::get_requires(
            FilterSet::installed(),
            id("glibc;2.38;x86_64;installed"),
            true
        )
    );
    assert_eq!(
        started[1],
        OperationRequest::remove(id("glibc;2.38;x86_64;installed"), true)
    );
}

#[tokio::test]
async fn test_pulse_gives_way_to_determinate_bar() {
    let bus = MemoryBus::default();
    bus.script(
        Role::InstallPackage,
        vec![
            package(InfoKind::Installing, "vim;9.0;x86_64;fedora"),
            progress(50, 101),
            progress(50, 30),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &[], true).await;

    let outcome = Command::Install {
        package: "vim;9.0;x86_64;fedora".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert!(outcome.is_success());
    let out = h.out.contents();
    let indeterminate = out.find(" [               ] (50%)").unwrap();
    let determinate = out.find(" [=====          ] (50%)").unwrap();
    let complete = out.find(" [===============] (50%)\n").unwrap();
    assert!(indeterminate < determinate && determinate < complete);
    assert!(out.ends_with("install-package runtime was 1.5 seconds\n"));
    assert!(!h.ctx.console.is_pulsing());
}

#[tokio::test]
async fn test_accepted_key_requeues_once() {
    let bus = MemoryBus::default();
    bus.script(
        Role::InstallPackage,
        vec![
            signature_required("vim;9.0;x86_64;updates"),
            ServiceEvent::error_code(ErrorKind::GpgFailure, "key BEEF0042 not trusted"),
            finished(ExitReason::KeyRequired),
        ],
    );
    bus.script(
        Role::InstallPackage,
        vec![
            package(InfoKind::Installing, "vim;9.0;x86_64;updates"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &["y"], false).await;

    let outcome = Command::Install {
        package: "vim;9.0;x86_64;updates".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Finished(ExitReason::Success));
    let started = h.bus.started();
    assert_eq!(started.len(), 3);
    assert_eq!(
        started[1],
        OperationRequest::install_signature(SigType::Gpg, "BEEF0042", id("vim;9.0;x86_64;updates"))
    );
    assert_eq!(started[0], started[2]);
    assert_eq!(h.prompt.asked(), vec!["Okay to import key? [N/y] "]);

    let out = h.out.contents();
    assert!(out.contains("Repository Signature Required\n"));
    assert!(out.contains("ID:          BEEF0042\n"));
    assert!(!out.contains("gpg-failure"));
}

#[tokio::test]
async fn test_key_installed_before_primary_finishes_requeues_once() {
    let bus = MemoryBus::default();
    // the primary stays running until the test finishes it
    bus.script(
        Role::InstallPackage,
        vec![
            signature_required("vim;9.0;x86_64;updates"),
            ServiceEvent::error_code(ErrorKind::GpgFailure, "key BEEF0042 not trusted"),
        ],
    );
    bus.script(
        Role::InstallPackage,
        vec![
            package(InfoKind::Installing, "vim;9.0;x86_64;updates"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &["y"], false).await;
    let service = h.bus.clone();

    let finish_primary = async {
        while service.started().len() < 2 {
            tokio::task::yield_now().await;
        }
        // let the signature handle report success first
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.started().len(), 2);
        let primary = service.started_handles()[0];
        service.emit(primary, finished(ExitReason::KeyRequired));
    };
    let command = Command::Install {
        package: "vim;9.0;x86_64;updates".into(),
    }
    .execute(&mut h.ctx);
    let (outcome, ()) = tokio::join!(command, finish_primary);

    assert_eq!(outcome.unwrap(), Outcome::Finished(ExitReason::Success));
    let started = h.bus.started();
    assert_eq!(started.len(), 3);
    assert_eq!(started[1].role, Role::InstallSignature);
    assert_eq!(started[0], started[2]);
    let handles = h.bus.started_handles();
    assert_eq!(handles[0], handles[2]);
    assert!(!h.out.contents().contains("gpg-failure"));
}

#[tokio::test]
async fn test_lookup_handle_released_after_command() {
    let bus = MemoryBus::default();
    bus.script(
        Role::Resolve,
        vec![
            package(InfoKind::Installed, "vim;9.0;x86_64;installed"),
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &[], false).await;

    let outcome = Command::Remove {
        package: "vim".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert!(outcome.is_success());
    let handles = h.bus.started_handles();
    let lookup = handles[0];
    let primary = *handles.last().unwrap();
    assert_ne!(lookup, primary);
    assert!(h.ctx.cancellation.outstanding().is_empty());
    let released = h.bus.released();
    assert!(released.contains(&lookup));
    assert!(released.contains(&primary));
}

#[tokio::test]
async fn test_accepted_key_does_not_requeue_refresh() {
    let bus = MemoryBus::default();
    bus.script(
        Role::RefreshCache,
        vec![
            signature_required("vim;9.0;x86_64;updates"),
            ServiceEvent::error_code(ErrorKind::GpgFailure, "key BEEF0042 not trusted"),
            finished(ExitReason::KeyRequired),
        ],
    );
    let mut h = harness(bus, &["y"], false).await;

    let outcome = Command::Refresh { force: false }
        .execute(&mut h.ctx)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Finished(ExitReason::KeyRequired));
    let started = h.bus.started();
    assert_eq!(started.len(), 2);
    assert_eq!(started[1].role, Role::InstallSignature);
    assert!(h
        .out
        .contents()
        .contains("Error: gpg-failure : key BEEF0042 not trusted\n"));
}

#[tokio::test]
async fn test_declined_key_never_requeues() {
    let bus = MemoryBus::default();
    bus.script(
        Role::InstallPackage,
        vec![
            signature_required("vim;9.0;x86_64;updates"),
            ServiceEvent::error_code(ErrorKind::GpgFailure, "key BEEF0042 not trusted"),
            finished(ExitReason::KeyRequired),
        ],
    );
    let mut h = harness(bus, &["n"], false).await;

    let outcome = Command::Install {
        package: "vim;9.0;x86_64;updates".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Finished(ExitReason::KeyRequired));
    assert_eq!(h.bus.started().len(), 1);
    let out = h.out.contents();
    assert!(out.contains("Did not import key, task will fail\n"));
    assert!(out.contains("Error: gpg-failure : key BEEF0042 not trusted\n"));
}

#[tokio::test]
async fn test_failed_key_install_keeps_primary_failure() {
    let bus = MemoryBus::default();
    bus.script(
        Role::InstallPackage,
        vec![
            signature_required("vim;9.0;x86_64;updates"),
            ServiceEvent::error_code(ErrorKind::GpgFailure, "key BEEF0042 not trusted"),
            finished(ExitReason::KeyRequired),
        ],
    );
    bus.script(Role::InstallSignature, vec![finished(ExitReason::Failed)]);
    let mut h = harness(bus, &["y"], false).await;

    let outcome = Command::Install {
        package: "vim;9.0;x86_64;updates".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Finished(ExitReason::KeyRequired));
    assert_eq!(h.bus.started().len(), 2);
    assert!(h.err.contents().contains("Failed to install signature"));
    assert!(h
        .out
        .contents()
        .contains("Error: gpg-failure : key BEEF0042 not trusted\n"));
}

#[tokio::test]
async fn test_declined_licence_is_reported() {
    let bus = MemoryBus::default();
    bus.script(
        Role::InstallPackage,
        vec![
            ServiceEvent::EulaRequired(pkc_events::EulaRequired {
                eula_id: "java-eula".into(),
                package_id: "java;21;x86_64;vendor".into(),
                vendor_name: "Vendor".into(),
                license_agreement: "Do not run on Tuesdays".into(),
            }),
            finished(ExitReason::EulaRequired),
        ],
    );
    let mut h = harness(bus, &["n"], false).await;

    let outcome = Command::Install {
        package: "java;21;x86_64;vendor".into(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Finished(ExitReason::EulaRequired));
    assert_eq!(h.prompt.asked(), vec!["Do you agree? [N/y] "]);
    assert!(h
        .out
        .contents()
        .contains("Did not agree to licence, task will fail\n"));
    assert_eq!(h.bus.started().len(), 1);
}

#[tokio::test]
async fn test_lost_connection_is_remote_disconnect() {
    let bus = MemoryBus::default();
    bus.script(
        Role::UpdateSystem,
        vec![
            package(InfoKind::Downloading, "kernel;6.9;x86_64;updates"),
            ServiceEvent::ConnectionChanged { connected: false },
        ],
    );
    let mut h = harness(bus, &[], true).await;

    let err = Command::Update { package: None }
        .execute(&mut h.ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transaction(TransactionError::RemoteDisconnect)
    ));
    assert!(h.out.contents().ends_with('\n'));
}

#[tokio::test]
async fn test_interrupt_cancels_running_transaction() {
    let bus = MemoryBus::default();
    bus.script(
        Role::UpdateSystem,
        vec![package(InfoKind::Downloading, "kernel;6.9;x86_64;updates")],
    );
    let mut h = harness(bus, &[], false).await;
    let coordinator = h.ctx.cancellation.clone();
    let bus = h.bus.clone();

    let (outcome, _) = tokio::join!(
        Command::Update { package: None }.execute(&mut h.ctx),
        async {
            while bus.started().is_empty() {
                tokio::task::yield_now().await;
            }
            coordinator.interrupt().await
        }
    );

    assert_eq!(outcome.unwrap(), Outcome::Finished(ExitReason::Cancelled));
    assert_eq!(h.bus.cancelled().len(), 1);
    assert!(h.ctx.cancellation.outstanding().is_empty());
}

#[tokio::test]
async fn test_restart_is_reported_after_summary() {
    let bus = MemoryBus::default();
    bus.script(
        Role::UpdateSystem,
        vec![
            ServiceEvent::RequireRestart {
                restart: pkc_types::RestartKind::Session,
                package_id: String::new(),
            },
            ServiceEvent::RequireRestart {
                restart: pkc_types::RestartKind::System,
                package_id: "kernel;6.9;x86_64;updates".into(),
            },
            finished(ExitReason::Success),
        ],
    );
    let mut h = harness(bus, &[], false).await;

    Command::Update { package: None }
        .execute(&mut h.ctx)
        .await
        .unwrap();

    assert_eq!(
        h.out.contents(),
        "update-system runtime was 1.5 seconds\nRequires restart: system\n"
    );
}

#[tokio::test]
async fn test_local_file_installs_without_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vim-9.0.x86_64.pkg");
    std::fs::write(&path, b"package").unwrap();
    let mut h = harness(MemoryBus::default(), &[], false).await;

    Command::Install {
        package: path.display().to_string(),
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(h.bus.started(), vec![OperationRequest::install_file(&path)]);
}

#[tokio::test]
async fn test_nowait_detaches_after_start() {
    let bus = Arc::new(MemoryBus::default());
    let mut ctx = TransactionContextBuilder::new()
        .with_bus(bus.clone())
        .with_console(Console::new(
            Box::new(Capture::new()),
            Box::new(Capture::new()),
            ProgressRenderer::new(15, false),
            false,
        ))
        .with_prompt(Box::new(ScriptedPrompt::default()))
        .with_nowait(true)
        .build()
        .await
        .unwrap();

    let outcome = Command::Refresh { force: true }
        .execute(&mut ctx)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Detached);
    assert_eq!(bus.started(), vec![OperationRequest::refresh(true)]);
}

#[tokio::test]
async fn test_filter_override_reaches_listing() {
    let bus = Arc::new(MemoryBus::default());
    let filters: FilterSet = "installed;~devel".parse().unwrap();
    let mut ctx = TransactionContextBuilder::new()
        .with_bus(bus.clone())
        .with_console(Console::new(
            Box::new(Capture::new()),
            Box::new(Capture::new()),
            ProgressRenderer::new(15, false),
            false,
        ))
        .with_prompt(Box::new(ScriptedPrompt::default()))
        .with_filters(Some(filters.clone()))
        .build()
        .await
        .unwrap();

    Command::GetPackages.execute(&mut ctx).await.unwrap();

    assert_eq!(bus.started(), vec![OperationRequest::get_packages(filters)]);
}

#[tokio::test]
async fn test_time_since_action() {
    let bus = MemoryBus::default();
    bus.set_time_since(Role::RefreshCache, Duration::from_secs(90));
    let mut h = harness(bus, &[], false).await;

    Command::GetTime {
        role: Role::RefreshCache,
    }
    .execute(&mut h.ctx)
    .await
    .unwrap();

    assert_eq!(h.out.contents(), "time since refresh-cache is 90s\n");
    assert!(h.bus.started().is_empty());
    assert_eq!(
        h.bus.time_since_action(Role::RefreshCache).await.unwrap(),
        Duration::from_secs(90)
    );
}
