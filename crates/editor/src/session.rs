use std::fs;
use std::path::{Path, PathBuf};

use catalog::EffectCatalog;
use serde::{Deserialize, Serialize};

use crate::layers::{Layer, LayerError, LayerModel};
use crate::params::{ParameterChange, ParameterError, ParameterStore, ShaderParameters};

pub const PROJECT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to read project file at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write project file to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse project file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize project file: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("unsupported project version {0}; expected 1")]
    Version(u32),
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error(transparent)]
    Layers(#[from] LayerError),
}

/// On-disk form of an editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: u32,
    pub effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default)]
    pub parameters: ShaderParameters,
    #[serde(rename = "layer")]
    pub layers: Vec<Layer>,
}

impl ProjectFile {
    pub fn from_toml_str(input: &str) -> Result<Self, SessionError> {
        let project: Self = toml::from_str(input)?;
        if project.version != PROJECT_VERSION {
            return Err(SessionError::Version(project.version));
        }
        Ok(project)
    }

    pub fn to_toml_string(&self) -> Result<String, SessionError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// The editor's mutable state grouped behind one owner: the parameter store
/// with its selection and the layer model. All mutation goes through methods.
#[derive(Debug, Clone)]
pub struct EditorSession {
    catalog: EffectCatalog,
    params: ParameterStore,
    layers: LayerModel,
    component_name: Option<String>,
}

impl EditorSession {
    /// Fresh session on the catalog's first effect with one default text layer.
    pub fn new(catalog: EffectCatalog) -> Self {
        let params = ParameterStore::new(catalog.default_effect());
        Self {
            catalog,
            params,
            layers: LayerModel::new(),
            component_name: None,
        }
    }

    pub fn from_project(catalog: EffectCatalog, project: ProjectFile) -> Result<Self, SessionError> {
        let selection = catalog.get(&project.effect).map_err(ParameterError::from)?;
        let params = ParameterStore::with_parameters(selection, project.parameters)?;
        let layers = LayerModel::from_layers(project.layers)?;
        Ok(Self {
            catalog,
            params,
            layers,
            component_name: project.component_name,
        })
    }

    pub fn to_project(&self) -> ProjectFile {
        ProjectFile {
            version: PROJECT_VERSION,
            effect: self.params.selection().id.clone(),
            component_name: self.component_name.clone(),
            parameters: self.params.snapshot(),
            layers: self.layers.layers().to_vec(),
        }
    }

    pub fn load(catalog: EffectCatalog, path: &Path) -> Result<Self, SessionError> {
        let contents = fs::read_to_string(path).map_err(|source| SessionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let project = ProjectFile::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), effect = %project.effect, "loaded project");
        Self::from_project(catalog, project)
    }

    pub fn persist(&self, path: &Path) -> Result<(), SessionError> {
        let serialized = self.to_project().to_toml_string()?;
        let write_err = |source| SessionError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        fs::write(path, serialized).map_err(write_err)?;
        Ok(())
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    pub fn layers(&self) -> &LayerModel {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerModel {
        &mut self.layers
    }

    pub fn component_name(&self) -> Option<&str> {
        self.component_name.as_deref()
    }

    pub fn set_component_name(&mut self, name: Option<String>) {
        self.component_name = name;
    }

    pub fn select_effect(&mut self, id: &str) -> Result<ParameterChange, ParameterError> {
        self.params.set_selection(&self.catalog, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::layers::{LayerKind, LayerPatch};
    use crate::params::ScalarField;
    use tempfile::TempDir;

    fn session() -> EditorSession {
        EditorSession::new(EffectCatalog::builtin().unwrap())
    }

    #[test]
    fn new_session_starts_on_first_effect() {
        let session = session();
        assert_eq!(session.params().selection().id, "plasma");
        assert_eq!(session.layers().len(), 1);
    }

    #[test]
    fn persist_and_load_preserve_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/project.toml");

        let mut session = session();
        session.select_effect("aurora").unwrap();
        session.params_mut().set_scalar(ScalarField::Speed, 2.5);
        session.params_mut().set_custom_value("bands", 6.0).unwrap();
        session
            .params_mut()
            .set_palette_slot(0, Rgb::new(0x12, 0x34, 0x56))
            .unwrap();
        let id = session.layers_mut().add(LayerKind::Button).id.clone();
        session.layers_mut().update(
            &id,
            LayerPatch {
                text: Some("Launch".into()),
                ..LayerPatch::default()
            },
        );
        session.set_component_name(Some("HeroBanner".into()));
        session.persist(&path).unwrap();

        let restored = EditorSession::load(EffectCatalog::builtin().unwrap(), &path).unwrap();
        assert_eq!(restored.to_project(), session.to_project());
        assert_eq!(restored.params().custom_value("bands"), Some(6.0));
        assert_eq!(restored.layers().get(&id).unwrap().text, "Launch");
        assert_eq!(restored.component_name(), Some("HeroBanner"));
    }

    #[test]
    fn rejects_projects_with_short_palette() {
        let input = r##"
version = 1
effect = "plasma"

[parameters]
palette = ["#000000", "#ffffff"]

[[layer]]
id = "layer-1"
kind = "text"
text = "Hi"
position = { x = 10.0, y = 10.0 }
size = 24.0
font_family = "Inter"
font_weight = 400
opacity = 1.0
color = "#ffffff"
"##;
        assert!(matches!(
            ProjectFile::from_toml_str(input),
            Err(SessionError::Parse(_))
        ));
    }

    #[test]
    fn rejects_unknown_versions_and_effects() {
        let mut project = session().to_project();
        project.version = 7;
        let text = project.to_toml_string().unwrap();
        assert!(matches!(
            ProjectFile::from_toml_str(&text),
            Err(SessionError::Version(7))
        ));

        let mut project = session().to_project();
        project.effect = "missing".into();
        let err = EditorSession::from_project(EffectCatalog::builtin().unwrap(), project)
            .unwrap_err();
        assert!(matches!(err, SessionError::Parameters(_)));
    }
}
