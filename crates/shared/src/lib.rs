use serde::{Deserialize, Deserializer, Serialize};

pub mod color;

pub use color::Rgb;

/// Идентификатор формы (грань, ребро, вершина) внутри одного BRep-представления
pub type ShapeId = u32;

// ============================================================================
// Данные процесса (process_data.json), формируемые конвертером
// ============================================================================

/// Корневой документ process_data.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProcessData {
    #[serde(default)]
    pub parts: Vec<ProcessDataPart>,
}

impl ProcessData {
    /// Найти данные детали по её ID
    pub fn part(&self, part_id: &str) -> Option<&ProcessDataPart> {
        self.parts.iter().find(|p| p.part_id == part_id)
    }

    /// Название процесса первой детали (заголовок карточки в галерее)
    pub fn process_title(&self) -> Option<&str> {
        self.parts
            .first()
            .map(|p| p.process.as_str())
            .filter(|p| !p.is_empty())
    }
}

/// Данные одной детали модели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDataPart {
    /// ID соответствующей детали в сцене
    #[serde(deserialize_with = "lenient::string")]
    pub part_id: String,
    /// Название процесса обработки
    #[serde(default)]
    pub process: String,
    /// Сообщение об ошибке, если конвертация детали не удалась
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Распознанные фичи
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_recognition: Option<Section>,
    /// DFM-анализ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfm: Option<Section>,
    /// Распознанные параметры развёртки (только листовой металл)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_recognition_unfolded: Option<UnfoldedSection>,
    /// DFM-анализ развёртки (только листовой металл)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfm_unfolded: Option<Section>,
}

impl ProcessDataPart {
    /// Непустое сообщение об ошибке детали
    pub fn error_message(&self) -> Option<&str> {
        non_empty(self.error.as_deref())
    }

    /// Секция с группами фич для выбранного типа дерева и состояния развёртки
    pub fn section(&self, kind: TreeKind, fold: FoldState) -> Option<&Section> {
        match (kind, fold) {
            (TreeKind::Features, FoldState::Folded) => self.feature_recognition.as_ref(),
            (TreeKind::Features, FoldState::Unfolded) => None,
            (TreeKind::Dfm, FoldState::Folded) => self.dfm.as_ref(),
            (TreeKind::Dfm, FoldState::Unfolded) => self.dfm_unfolded.as_ref(),
        }
    }

    /// Группы фич для выбранного режима (пусто, если вместо секции сообщение)
    pub fn feature_groups(&self, kind: TreeKind, fold: FoldState) -> &[FeatureGroup] {
        self.section(kind, fold)
            .and_then(|s| s.feature_groups.as_deref())
            .unwrap_or(&[])
    }
}

/// Секция распознавания фич или DFM: либо сообщение, либо список групп
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub total_feature_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_groups: Option<Vec<FeatureGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Section {
    pub fn message(&self) -> Option<&str> {
        non_empty(self.message.as_deref())
    }
}

/// Параметры развёртки листовой детали (без групп)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UnfoldedSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub parameters_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UnfoldedSection {
    pub fn message(&self) -> Option<&str> {
        non_empty(self.message.as_deref())
    }
}

/// Группа фич: либо плоский список `features`, либо `subGroups`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGroup {
    pub name: String,
    /// Цвет группы в виде "(126, 10, 1)"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub total_group_feature_count: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub sub_group_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_groups: Option<Vec<SubGroup>>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<Feature>>,
}

impl FeatureGroup {
    /// Цвет группы, нормализованный в 0–1 (белый, если цвет не распознан)
    pub fn rgb(&self) -> Rgb {
        self.color
            .as_deref()
            .and_then(Rgb::parse)
            .unwrap_or(Rgb::WHITE)
    }
}

/// Подгруппа: общие параметры + фичи, которые их разделяют
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubGroup {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub parameters_count: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Фича: лист дерева, связанный с нулём или более форм
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Feature {
    #[serde(
        rename = "shapeIDCount",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub shape_id_count: Option<String>,
    #[serde(rename = "shapeIDs", default)]
    pub shape_ids: Vec<ShapeIdRef>,
}

impl Feature {
    /// true, если `shapeIDCount` положительный
    pub fn has_shapes(&self) -> bool {
        self.shape_id_count
            .as_deref()
            .and_then(|c| c.trim().parse::<f64>().ok())
            .is_some_and(|c| c > 0.0)
    }

    /// Числовые ID форм (нечисловые пропускаются)
    pub fn shape_ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.shape_ids.iter().filter_map(ShapeIdRef::shape_id)
    }
}

/// Ссылка на форму: `{ "id": "42" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ShapeIdRef {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
}

impl ShapeIdRef {
    pub fn shape_id(&self) -> Option<ShapeId> {
        self.id.trim().parse().ok()
    }
}

/// Именованный параметр (например, диаметр отверстия)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub units: String,
    #[serde(deserialize_with = "lenient::string")]
    pub value: String,
}

// ============================================================================
// Режимы отображения дерева
// ============================================================================

/// Тип дерева в правой панели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeKind {
    #[default]
    Features,
    Dfm,
}

/// Исходная деталь или развёртка (листовой металл)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldState {
    #[default]
    Folded,
    Unfolded,
}

// ============================================================================
// HTTP API
// ============================================================================

/// Карточка модели в галерее
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCard {
    pub process_title: String,
    pub title: String,
    pub href: String,
    pub src: String,
}

/// Ответ на успешную загрузку и конвертацию модели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub model_name: String,
    /// Папка операции внутри native/ (только механообработка)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_path: Option<String>,
    /// Название процесса из process_data.json (только механообработка)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Конвертер пишет числа строками, но иногда и числами
mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    impl From<StringOrNumber> for String {
        fn from(v: StringOrNumber) -> Self {
            match v {
                StringOrNumber::String(s) => s,
                StringOrNumber::Number(n) => n.to_string(),
            }
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        StringOrNumber::deserialize(d).map(String::from)
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<StringOrNumber>::deserialize(d)?.map(String::from))
    }
}
