/// Background file loading for the terminal host
use std::fs::File;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use modelview_core::loader::read_with_progress;
use modelview_core::{LoadError, LoadEvent, LoadRequest};

/// Event tagged with the request it belongs to
pub type LoadMessage = (u64, LoadEvent);

/// Read `request.url` as a file path on a worker thread.
///
/// Progress and the final result are sent over `events`; a dropped receiver
/// just ends the worker early.
pub fn spawn_load(request: LoadRequest, events: Sender<LoadMessage>) -> JoinHandle<()> {
    thread::spawn(move || {
        let id = request.id;
        let progress_events = events.clone();
        let result = read_file(&request, |progress| {
            let _ = progress_events.send((id, LoadEvent::Progress(progress)));
        });
        let _ = events.send((id, LoadEvent::from_fetch(result)));
    })
}

fn read_file(
    request: &LoadRequest,
    on_progress: impl FnMut(modelview_core::LoadProgress),
) -> Result<Vec<u8>, LoadError> {
    let path = Path::new(&request.url);
    let file = File::open(path)?;
    let total = file.metadata().ok().map(|m| m.len());
    log::debug!("reading {} ({:?} bytes)", path.display(), total);
    read_with_progress(file, total, &request.cancel, on_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelview_core::CancelToken;
    use std::sync::mpsc;

    fn request(url: &str) -> LoadRequest {
        LoadRequest {
            id: 7,
            url: url.to_string(),
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_missing_file_fails() {
        let (tx, rx) = mpsc::channel();
        spawn_load(request("/definitely/not/here.glb"), tx).join().unwrap();
        let (id, event) = rx.recv().unwrap();
        assert_eq!(id, 7);
        assert!(matches!(event, LoadEvent::Failed(LoadError::Io(_))));
    }

    #[test]
    fn test_stl_file_loads_with_progress() {
        let path = std::env::temp_dir().join(format!("modelview-{}.stl", std::process::id()));
        std::fs::write(
            &path,
            concat!(
                "solid t\nfacet normal 0 0 1\nouter loop\n",
                "vertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\n",
                "endloop\nendfacet\nendsolid t\n",
            ),
        )
        .unwrap();

        let (tx, rx) = mpsc::channel();
        spawn_load(request(path.to_str().unwrap()), tx).join().unwrap();
        let events: Vec<_> = rx.iter().map(|(_, e)| e).collect();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(events.first(), Some(LoadEvent::Progress(_))));
        match events.last() {
            Some(LoadEvent::Loaded(model)) => assert_eq!(model.triangle_count(), 1),
            other => panic!("expected loaded model, got {other:?}"),
        }
    }
}
