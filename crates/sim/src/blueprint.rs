//! Actor templates and the library they are looked up in.
//!
//! Filtering follows the simulator convention: a pattern is matched with
//! shell-style wildcards (`*`, `?`) against the blueprint id and against each
//! of its tags, so `"model3"` finds `vehicle.tesla.model3` through its tag and
//! `"vehicle.*"` finds every vehicle through its id.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    id: String,
    tags: Vec<String>,
    attributes: BTreeMap<String, String>,
}

impl Blueprint {
    #[must_use]
    pub fn new(id: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            id: id.into(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_owned(), value.to_string());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: &str, value: impl ToString) {
        self.attributes.insert(key.to_owned(), value.to_string());
    }

    #[must_use]
    pub fn matches(&self, pattern: &str) -> bool {
        wildcard_match(pattern, &self.id) || self.tags.iter().any(|t| wildcard_match(pattern, t))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlueprintLibrary {
    blueprints: Vec<Blueprint>,
}

impl BlueprintLibrary {
    #[must_use]
    pub fn new(blueprints: Vec<Blueprint>) -> Self {
        Self { blueprints }
    }

    /// All blueprints matching `pattern`, in library order.
    #[must_use]
    pub fn filter(&self, pattern: &str) -> Vec<&Blueprint> {
        self.blueprints.iter().filter(|bp| bp.matches(pattern)).collect()
    }

    /// Exact id lookup.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Blueprint> {
        self.blueprints.iter().find(|bp| bp.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blueprint> {
        self.blueprints.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // position of the last '*' seen and the text index it was tried at
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> BlueprintLibrary {
        BlueprintLibrary::new(vec![
            Blueprint::new("vehicle.tesla.model3", &["vehicle", "tesla", "model3"]),
            Blueprint::new("vehicle.audi.tt", &["vehicle", "audi", "tt"]),
            Blueprint::new("sensor.camera.rgb", &["sensor", "camera", "rgb"]),
        ])
    }

    #[test]
    fn wildcards() {
        assert!(wildcard_match("vehicle.*", "vehicle.audi.tt"));
        assert!(wildcard_match("*.rgb", "sensor.camera.rgb"));
        assert!(wildcard_match("sensor.?amera.*", "sensor.camera.rgb"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("vehicle", "vehicle.audi.tt"));
        assert!(!wildcard_match("*.depth", "sensor.camera.rgb"));
    }

    #[test]
    fn filter_matches_tags_and_ids() {
        let lib = library();
        let hits = lib.filter("model3");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "vehicle.tesla.model3");
        assert_eq!(lib.filter("vehicle.*").len(), 2);
        assert!(lib.filter("bicycle").is_empty());
    }

    #[test]
    fn find_is_exact() {
        let lib = library();
        assert!(lib.find("sensor.camera.rgb").is_some());
        assert!(lib.find("camera").is_none());
    }
}
