use anyhow::{Context, Result, bail};
use meshcall_client::media::SyntheticDevices;
use meshcall_client::peer::{NegotiationState, PeerLinkSummary};
use meshcall_client::transport::LoopbackFactory;
use meshcall_client::{
    ManagerConfig, MeshServices, PeerConnectionManager, PeerEvent, PeerManagerHandle,
    StaticDirectory,
};
use meshcall_core::{Meeting, MeetingId, MeetingSettings, RoomHub, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const POLL_INTERVAL_MS: u64 = 20;

#[derive(Debug, Clone, Copy)]
pub struct SimulationOptions {
    pub participants: usize,
    pub screen_share: bool,
    pub drop: Option<usize>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ParticipantReport {
    pub user_id: UserId,
    pub screen_sharing: bool,
    pub links: Vec<PeerLinkSummary>,
}

/// Runs a meeting of `participants` managers against one hub and returns
/// the mesh each remaining participant ends up with.
pub async fn simulate(options: SimulationOptions) -> Result<Vec<ParticipantReport>> {
    if options.participants == 0 {
        bail!("A meeting needs at least one participant");
    }
    if let Some(index) = options.drop {
        if index >= options.participants {
            bail!(
                "Cannot drop participant {} of {}",
                index,
                options.participants
            );
        }
    }

    let hub = RoomHub::new();
    let factory = LoopbackFactory::new();
    let meeting_id = MeetingId::new();
    let user_ids: Vec<UserId> = (1..=options.participants as u128)
        .map(UserId::from_u128)
        .collect();

    let directory = Arc::new(StaticDirectory::new());
    directory.insert(Meeting {
        id: meeting_id.clone(),
        title: "simulated meeting".into(),
        host_id: user_ids[0].clone(),
        settings: MeetingSettings {
            mute_on_join: false,
            video_on_join: true,
        },
    });

    let mut handles = Vec::with_capacity(user_ids.len());
    for user_id in &user_ids {
        let services = MeshServices {
            transport: Arc::new(hub.clone()),
            directory: directory.clone(),
            devices: Arc::new(SyntheticDevices::new()),
            connections: Arc::new(factory.clone()),
        };
        let (handle, events) = PeerConnectionManager::initialize(
            services,
            ManagerConfig::default(),
            meeting_id.clone(),
            user_id.clone(),
        )
        .await
        .with_context(|| format!("{user_id} failed to join"))?;

        tokio::spawn(log_events(user_id.clone(), events));
        handle
            .attach_local_media(true, true)
            .await
            .with_context(|| format!("{user_id} failed to capture media"))?;
        handles.push(handle);
    }

    let expected = options.participants - 1;
    if !wait_for_mesh(&handles, expected, options.timeout_ms).await {
        bail!("Mesh did not settle within {}ms", options.timeout_ms);
    }
    info!("Mesh of {} participants settled", options.participants);

    if options.screen_share {
        handles[0]
            .start_screen_share()
            .await
            .context("Screen share failed")?;
    }

    if let Some(index) = options.drop {
        let dropped = handles.remove(index);
        info!("Dropping {}", dropped.local_user_id());
        dropped.cleanup().await?;

        if !wait_for_mesh(&handles, expected.saturating_sub(1), options.timeout_ms).await {
            bail!("Mesh did not recover after dropping participant {index}");
        }
    }

    let rows = hub.snapshot(&meeting_id);
    let mut reports = Vec::with_capacity(handles.len());
    for handle in &handles {
        let user_id = handle.local_user_id().clone();
        let screen_sharing = rows
            .iter()
            .any(|row| row.user_id == user_id && row.flags.screen_sharing);
        reports.push(ParticipantReport {
            links: handle.links().await?,
            user_id,
            screen_sharing,
        });
    }

    for handle in &handles {
        handle.cleanup().await?;
    }
    Ok(reports)
}

/// Polls until every handle holds `links` stable links.
async fn wait_for_mesh(handles: &[PeerManagerHandle], links: usize, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if is_settled(handles, links).await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

async fn is_settled(handles: &[PeerManagerHandle], links: usize) -> bool {
    for handle in handles {
        match handle.links().await {
            Ok(summary)
                if summary.len() == links
                    && summary.iter().all(|l| l.state == NegotiationState::Stable) => {}
            _ => return false,
        }
    }
    true
}

async fn log_events(user_id: UserId, mut events: mpsc::UnboundedReceiver<PeerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PeerEvent::Stream {
                user_id: from,
                stream,
                is_local,
            } => debug!(
                "{}: stream {} from {} ({} tracks, local: {})",
                user_id,
                stream.id,
                from,
                stream.tracks.len(),
                is_local
            ),
            PeerEvent::StreamEnded { user_id: from } => {
                debug!("{}: stream from {} ended", user_id, from)
            }
            PeerEvent::Error {
                user_id: from,
                error,
            } => warn!("{}: error on link to {}: {}", user_id, from, error),
            PeerEvent::ParticipantsChanged(rows) => {
                debug!("{}: {} participants in the room", user_id, rows.len())
            }
        }
    }
}
