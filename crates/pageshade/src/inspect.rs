//! Headless commands: `trace` paints frames on the recording surface and
//! `layout` dumps block rectangles.

use anyhow::{Context, Result};
use overlay::recording::{CountingRequester, RecordingSurface, SurfaceCall};
use overlay::{CollectedDiagnostics, FrameScheduler, InstanceHandle, LayoutSource};
use pagedoc::{DetailsId, EntryKind, Page, PageLayout};
use serde::Serialize;

use crate::cli::{LayoutArgs, TraceArgs};
use crate::mount::mount;
use crate::run::load_page;

#[derive(Debug, Serialize)]
struct TraceOutput {
    diagnostics: Vec<TraceDiagnostic>,
    setup: Vec<SurfaceCall>,
    frames: Vec<FrameTrace>,
}

#[derive(Debug, Serialize)]
struct TraceDiagnostic {
    id: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct FrameTrace {
    frame: u32,
    time_ms: f64,
    drawn: usize,
    culled: usize,
    animating: bool,
    calls: Vec<SurfaceCall>,
}

pub fn trace(args: TraceArgs) -> Result<()> {
    let (_, mut layout, scene) = load_page(&args.page)?;
    layout.scroll_to(args.scroll);

    let surface = RecordingSurface::new(layout.viewport().surface_size());
    let mut scheduler = FrameScheduler::new(surface, CountingRequester::default());
    let mut diagnostics = CollectedDiagnostics::default();
    let handles = mount(&mut scheduler, &scene, &mut diagnostics);

    if let Some(id) = &args.play {
        let container = layout
            .container(id)
            .with_context(|| format!("no visualization with id '{id}'"))?;
        let handle = handles
            .get(container.0 as usize)
            .copied()
            .flatten()
            .with_context(|| format!("visualization '{id}' failed to compile"))?;
        let InstanceHandle::Animated(animated) = handle else {
            anyhow::bail!("visualization '{id}' is not animated");
        };
        scheduler.play(animated);
    }

    scheduler.run();
    let setup = scheduler.take_recorded_calls();

    let step_ms = args.step.as_secs_f64() * 1000.0;
    let mut frames = Vec::new();
    for frame in 0..args.frames {
        if !scheduler.frame_pending() {
            break;
        }
        let time_ms = f64::from(frame) * step_ms;
        let report = scheduler.draw_frame(time_ms, &layout);
        frames.push(FrameTrace {
            frame,
            time_ms,
            drawn: report.drawn,
            culled: report.culled,
            animating: report.animating,
            calls: scheduler.take_recorded_calls(),
        });
    }

    let diagnostics = diagnostics
        .entries
        .into_iter()
        .map(|entry| TraceDiagnostic {
            id: layout
                .shader_id(entry.container)
                .unwrap_or(entry.label.as_str())
                .to_string(),
            message: entry.message,
        })
        .collect::<Vec<_>>();
    for diagnostic in &diagnostics {
        eprintln!("error[{}]: {}", diagnostic.id, diagnostic.message);
    }

    let output = TraceOutput {
        diagnostics,
        setup,
        frames,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_trace(&output);
    }
    Ok(())
}

fn print_trace(output: &TraceOutput) {
    println!("setup: {} calls", output.setup.len());
    for call in &output.setup {
        println!("  {call:?}");
    }
    for frame in &output.frames {
        println!(
            "frame {} t={}ms drawn={} culled={} animating={}",
            frame.frame, frame.time_ms, frame.drawn, frame.culled, frame.animating
        );
        for call in &frame.calls {
            println!("  {call:?}");
        }
    }
}

pub fn layout(args: LayoutArgs) -> Result<()> {
    let page = Page::load(&args.page)
        .with_context(|| format!("failed to load page {}", args.page.display()))?;
    let mut layout = PageLayout::new(&page);
    if args.open_all {
        let mut details = DetailsId(0);
        while layout.is_open(details).is_some() {
            layout.set_open(details, true);
            details = DetailsId(details.0 + 1);
        }
    }
    layout.scroll_to(args.scroll);

    let entries = layout.entries();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let viewport = layout.viewport();
    println!(
        "viewport {}x{} @{} scroll={} content_height={}",
        viewport.css_width,
        viewport.css_height,
        viewport.pixel_ratio,
        viewport.scroll_y,
        layout.content_height()
    );
    for entry in entries {
        let label = match &entry.kind {
            EntryKind::Text => "text".to_string(),
            EntryKind::Shader { id, .. } => format!("shader {id}"),
            EntryKind::Summary { details, open } => {
                format!("details #{} ({})", details.0, if *open { "open" } else { "closed" })
            }
        };
        let rect = entry.rect;
        println!(
            "{label:<24} left={} top={} width={} height={}",
            rect.left, rect.top, rect.width, rect.height
        );
    }
    Ok(())
}
