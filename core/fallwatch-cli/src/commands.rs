//! One-shot subcommands. Each makes a single request and exits non-zero when
//! it fails; nothing here retries.

use fallwatch_core::{
    ApplianceTransport, ClipCatalog, HttpApplianceTransport, Mode, MonitorConfig, Notice, Result,
};
use fallwatch_protocol::FallEvent;

fn appliance(config: &MonitorConfig) -> Result<HttpApplianceTransport> {
    HttpApplianceTransport::new(config.appliance_base()?, config.request_timeout())
}

pub async fn status(config: &MonitorConfig) -> Result<()> {
    let transport = appliance(config)?;
    let status = transport.status().await?;

    println!("appliance   {}", transport.base());
    println!("mode        {}", Mode::from_armed(status.armed));
    println!("camera      {}", on_off(status.camera_active));
    println!("detection   {}", on_off(status.fall_detection_active));
    Ok(())
}

pub async fn set_mode(config: &MonitorConfig, mode: Mode) -> Result<()> {
    let transport = appliance(config)?;
    transport.set_mode(mode).await.inspect_err(|err| {
        tracing::warn!(error = %err, %mode, "Mode command rejected");
    })?;
    tracing::info!(%mode, "Mode command accepted");

    let notice = Notice::mode_confirmed(mode);
    println!("{}: {}", notice.title, notice.body);
    Ok(())
}

pub async fn falls(config: &MonitorConfig) -> Result<()> {
    let log = appliance(config)?.falls().await?;

    if log.falls.is_empty() {
        println!("No falls recorded");
        return Ok(());
    }
    for event in &log.falls {
        println!("{}", describe_fall(event));
    }
    println!("{} fall(s) in total", log.count);
    Ok(())
}

pub async fn clips(config: &MonitorConfig) -> Result<()> {
    let catalog = ClipCatalog::new(config.clips_base()?, config.request_timeout())?;
    if !catalog.is_online().await {
        tracing::warn!(clips = %config.clips_url, "Clip server did not report online");
    }

    let clips = catalog.list().await?;
    if clips.is_empty() {
        println!("No clips recorded");
        return Ok(());
    }
    for clip in &clips {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            clip.name,
            clip.recorded,
            clip.duration,
            clip.size.as_deref().unwrap_or("-"),
            clip.video_url
        );
    }
    Ok(())
}

fn on_off(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

fn describe_fall(event: &FallEvent) -> String {
    let when = event
        .recorded_at()
        .map(|at| at.format("%a %d %b %H:%M:%S").to_string())
        .unwrap_or_else(|| event.timestamp.clone());
    format!(
        "{}  subject {}  frame {}",
        when, event.subject_id, event.frame_index
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fall_line_uses_parsed_time() {
        let event = FallEvent {
            subject_id: 2,
            frame_index: 480,
            timestamp: "2025-03-01 10:04:12".to_string(),
        };
        assert_eq!(
            describe_fall(&event),
            "Sat 01 Mar 10:04:12  subject 2  frame 480"
        );
    }

    #[test]
    fn fall_line_keeps_unparseable_time() {
        let event = FallEvent {
            subject_id: 1,
            frame_index: 3,
            timestamp: "yesterday".to_string(),
        };
        assert_eq!(describe_fall(&event), "yesterday  subject 1  frame 3");
    }
}
