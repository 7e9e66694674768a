//! Lazy videos

use lazyact_dom::NodeId;

use crate::{Callback, ControllerOptions, EngineResult, ObserverOptions, Plugin, Runtime};

const SELECTOR: &str = "video[data-lazy-video]:not([data-lazy-video-init])";

/// Fills `<source data-src>` children and asks the host to load the video
#[derive(Debug, Clone)]
pub struct LazyVideo {
    options: ControllerOptions,
}

impl LazyVideo {
    pub fn new() -> EngineResult<Self> {
        let options = ControllerOptions {
            init_attribute: "lazyVideoInit".to_string(),
            options: ObserverOptions::from_margin("200px 100px")?,
            ..Default::default()
        }
        .with_callback(Callback::new(|rt, video, _| load_video(rt, video)));
        Ok(Self { options })
    }
}

impl Plugin for LazyVideo {
    fn name(&self) -> &'static str {
        "lazy-video"
    }

    fn marker(&self) -> &'static str {
        "lazyVideoInit"
    }

    fn initializer(&self, rt: &mut Runtime, container: NodeId) -> EngineResult<()> {
        super::attach_all(rt, container, SELECTOR, &self.options)?;
        Ok(())
    }

    fn cleans(&self) -> bool {
        true
    }
}

fn load_video(rt: &mut Runtime, video: NodeId) {
    let sources: Vec<NodeId> = rt
        .tree()
        .element_children(video)
        .into_iter()
        .filter(|&child| rt.tree().tag_name(child) == Some("source"))
        .collect();
    for source in sources {
        let tree = rt.tree_mut();
        let src = tree.remove_attribute(source, "data-src").unwrap_or_default();
        tree.set_attribute(source, "src", &src);
    }
    rt.document_mut().request_media_load(video);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyact_dom::Document;

    #[test]
    fn test_sources_and_load() {
        let mut rt = Runtime::new(Document::default());
        let body = rt.document().body();
        let tree = rt.tree_mut();
        let video = tree.create_element_with("video", &[("data-lazy-video", "")]);
        let webm = tree.create_element_with("source", &[("data-src", "clip.webm")]);
        let mp4 = tree.create_element_with("source", &[("data-src", "clip.mp4")]);
        let not_video = tree.create_element_with("div", &[("data-lazy-video", "")]);
        tree.append_child(body, video).unwrap();
        tree.append_child(video, webm).unwrap();
        tree.append_child(video, mp4).unwrap();
        tree.append_child(body, not_video).unwrap();

        LazyVideo::new().unwrap().initializer(&mut rt, body).unwrap();
        assert!(rt.instance_of(not_video).is_none());
        assert_eq!(rt.tree().get_attribute(video, "data-lazy-video-init"), Some("true"));

        rt.trigger(video);
        rt.run_pending();
        assert_eq!(rt.tree().get_attribute(webm, "src"), Some("clip.webm"));
        assert_eq!(rt.tree().get_attribute(mp4, "src"), Some("clip.mp4"));
        assert!(!rt.tree().has_attribute(mp4, "data-src"));
        assert_eq!(rt.document().media_load_requests(), &[video]);
    }
}
