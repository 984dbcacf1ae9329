// Copyright 2025 the Meshwarp Authors
// SPDX-License-Identifier: Apache-2.0

//! Shared attach logic and style hooks for every mode

use std::collections::HashMap;
use std::fmt;

use super::{AttachToken, Hook};
use crate::canvas::{Canvas, SceneObject};
use crate::session::Session;
use crate::theme::{self, ThemeColors};

/// Kind of object a style setter customizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleTarget {
    /// The warped image
    Image,
    /// Visible boundary paths
    Path,
    /// Vertex (corner) handles
    Control,
    /// Curve shape handles
    CurveControl,
    /// The insertion marker
    InsertControl,
    /// Guide lines between curve handles and their vertex
    Line,
}

pub type StyleSetter = Box<dyn Fn(&mut SceneObject)>;

/// Default renderer composed into each mode
pub struct BaseRenderer {
    pub theme: ThemeColors,
    setters: HashMap<StyleTarget, StyleSetter>,
}

impl BaseRenderer {
    pub fn new(theme: ThemeColors) -> Self {
        Self {
            theme,
            setters: HashMap::new(),
        }
    }

    pub fn register_style_setter(&mut self, target: StyleTarget, setter: StyleSetter) {
        self.setters.insert(target, setter);
    }

    /// Run the registered setter for `target`, if any
    pub fn apply_style(&self, target: StyleTarget, object: &mut SceneObject) {
        if let Some(setter) = self.setters.get(&target) {
            setter(object);
        }
    }

    /// Attach the warped image and the outermost path of every region side.
    ///
    /// Interior lattice paths are detached again; they stay in the session
    /// for lookups but are never shown.
    pub fn attach(&self, session: &Session, canvas: &mut dyn Canvas) -> Option<AttachToken> {
        let image = session.warp_object()?;
        if let Some(object) = canvas.object_mut(image) {
            self.apply_style(StyleTarget::Image, object);
        }
        canvas.add(image);
        for path in session.paths() {
            canvas.add(*path);
        }

        for region in session.engine().region_curves().iter().flatten() {
            for list in [&region.horizontal, &region.vertical] {
                let last = list.len().saturating_sub(1);
                for (index, curve) in list.iter().enumerate() {
                    let Some(path) = session.path_for(*curve) else {
                        continue;
                    };
                    if index != 0 && index != last {
                        canvas.remove(path);
                        continue;
                    }
                    if let Some(object) = canvas.object_mut(path) {
                        let center = object.center;
                        object.stroke = Some(self.theme.theme);
                        object.stroke_width = theme::path::STROKE_WIDTH;
                        object.fill = None;
                        object.selectable = false;
                        object.evented = false;
                        self.apply_style(StyleTarget::Path, object);
                        // stroke changes must not shift the path
                        object.center = center;
                    }
                }
            }
        }

        let mut attached = vec![image];
        attached.extend(session.paths().iter().copied().filter(|p| canvas.contains(*p)));
        tracing::debug!("attached image and {} paths", attached.len() - 1);
        Some(AttachToken::detach(Hook::Render, attached))
    }
}

impl Default for BaseRenderer {
    fn default() -> Self {
        Self::new(ThemeColors::default())
    }
}

impl fmt::Debug for BaseRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseRenderer")
            .field("theme", &self.theme)
            .field("setters", &self.setters.keys().collect::<Vec<_>>())
            .finish()
    }
}
