//! Typed views of the QuickSight template documents and their conversion into SDK requests.
//!
//! Unknown keys are rejected so that nothing in a template is silently dropped.

use crate::errors::Error;
use aws_sdk_quicksight::types::{
    AnalysisDefinition, CastColumnTypeOperation, CategoricalAggregationFunction,
    CategoricalDimensionField, CategoricalMeasureField, ColumnDataType, ColumnIdentifier,
    DataSetIdentifierDeclaration, DataSourceParameters, DateDimensionField, DimensionField,
    FileFormat, InputColumn, InputColumnDataType, LineChartAggregatedFieldWells,
    LineChartConfiguration, LineChartFieldWells, LineChartVisual, LogicalTable,
    LogicalTableSource, ManifestFileLocation, MeasureField, NumericalAggregationFunction,
    NumericalDimensionField, NumericalMeasureField, PhysicalTable, ProjectOperation,
    RenameColumnOperation, S3Parameters, S3Source, SheetDefinition, ShortFormatText,
    SimpleNumericalAggregationFunction, TextQualifier, TimeGranularity, TransformOperation,
    UploadSettings, Visibility, Visual, VisualTitleLabelOptions,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub fn decode<T: DeserializeOwned>(kind: &'static str, document: Value) -> Result<T, Error> {
    serde_json::from_value(document).map_err(|source| Error::UnsupportedTemplate { kind, source })
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn convert_all<S, T>(items: Vec<S>) -> Result<Vec<T>, Error>
where
    T: TryFrom<S, Error = Error>,
{
    items.into_iter().map(T::try_from).collect()
}

// Data source

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct DataSourceParametersTemplate {
    pub s3_parameters: S3ParametersTemplate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct S3ParametersTemplate {
    pub manifest_file_location: ManifestFileLocationTemplate,
    pub role_arn: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ManifestFileLocationTemplate {
    pub bucket: String,
    pub key: String,
}

impl TryFrom<DataSourceParametersTemplate> for DataSourceParameters {
    type Error = Error;

    fn try_from(template: DataSourceParametersTemplate) -> Result<Self, Error> {
        let location = template.s3_parameters.manifest_file_location;

        let manifest_file_location = ManifestFileLocation::builder()
            .bucket(location.bucket)
            .key(location.key)
            .build()?;

        let s3_parameters = S3Parameters::builder()
            .manifest_file_location(manifest_file_location)
            .set_role_arn(template.s3_parameters.role_arn)
            .build();

        Ok(DataSourceParameters::S3Parameters(s3_parameters))
    }
}

// Physical table

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct PhysicalTableTemplate {
    pub s3_source: S3SourceTemplate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct S3SourceTemplate {
    pub data_source_arn: String,
    pub upload_settings: Option<UploadSettingsTemplate>,
    pub input_columns: Vec<InputColumnTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct UploadSettingsTemplate {
    pub format: Option<String>,
    pub start_from_row: Option<i32>,
    pub contains_header: Option<bool>,
    pub text_qualifier: Option<String>,
    pub delimiter: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct InputColumnTemplate {
    pub name: String,
    #[serde(rename = "Type")]
    pub column_type: String,
}

impl From<UploadSettingsTemplate> for UploadSettings {
    fn from(template: UploadSettingsTemplate) -> Self {
        UploadSettings::builder()
            .set_format(template.format.as_deref().map(FileFormat::from))
            .set_start_from_row(template.start_from_row)
            .set_contains_header(template.contains_header)
            .set_text_qualifier(template.text_qualifier.as_deref().map(TextQualifier::from))
            .set_delimiter(template.delimiter)
            .build()
    }
}

impl TryFrom<InputColumnTemplate> for InputColumn {
    type Error = Error;

    fn try_from(template: InputColumnTemplate) -> Result<Self, Error> {
        Ok(InputColumn::builder()
            .name(template.name)
            .r#type(InputColumnDataType::from(template.column_type.as_str()))
            .build()?)
    }
}

impl TryFrom<PhysicalTableTemplate> for PhysicalTable {
    type Error = Error;

    fn try_from(template: PhysicalTableTemplate) -> Result<Self, Error> {
        let source = template.s3_source;

        let s3_source = S3Source::builder()
            .data_source_arn(source.data_source_arn)
            .set_upload_settings(source.upload_settings.map(UploadSettings::from))
            .set_input_columns(Some(convert_all(source.input_columns)?))
            .build()?;

        Ok(PhysicalTable::S3Source(s3_source))
    }
}

// Logical table

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct LogicalTableTemplate {
    pub alias: String,
    #[serde(default)]
    pub data_transforms: Vec<TransformTemplate>,
    pub source: LogicalTableSourceTemplate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct LogicalTableSourceTemplate {
    pub physical_table_id: Option<String>,
    pub data_set_arn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub enum TransformTemplate {
    ProjectOperation(ProjectTemplate),
    CastColumnTypeOperation(CastColumnTypeTemplate),
    RenameColumnOperation(RenameColumnTemplate),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ProjectTemplate {
    pub projected_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct CastColumnTypeTemplate {
    pub column_name: String,
    pub new_column_type: String,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RenameColumnTemplate {
    pub column_name: String,
    pub new_column_name: String,
}

impl TryFrom<TransformTemplate> for TransformOperation {
    type Error = Error;

    fn try_from(template: TransformTemplate) -> Result<Self, Error> {
        let operation = match template {
            TransformTemplate::ProjectOperation(project) => TransformOperation::ProjectOperation(
                ProjectOperation::builder()
                    .set_projected_columns(Some(project.projected_columns))
                    .build()?,
            ),
            TransformTemplate::CastColumnTypeOperation(cast) => {
                TransformOperation::CastColumnTypeOperation(
                    CastColumnTypeOperation::builder()
                        .column_name(cast.column_name)
                        .new_column_type(ColumnDataType::from(cast.new_column_type.as_str()))
                        .set_format(cast.format)
                        .build()?,
                )
            }
            TransformTemplate::RenameColumnOperation(rename) => {
                TransformOperation::RenameColumnOperation(
                    RenameColumnOperation::builder()
                        .column_name(rename.column_name)
                        .new_column_name(rename.new_column_name)
                        .build()?,
                )
            }
        };

        Ok(operation)
    }
}

impl TryFrom<LogicalTableTemplate> for LogicalTable {
    type Error = Error;

    fn try_from(template: LogicalTableTemplate) -> Result<Self, Error> {
        let source = LogicalTableSource::builder()
            .set_physical_table_id(template.source.physical_table_id)
            .set_data_set_arn(template.source.data_set_arn)
            .build();

        Ok(LogicalTable::builder()
            .alias(template.alias)
            .set_data_transforms(non_empty(convert_all(template.data_transforms)?))
            .source(source)
            .build()?)
    }
}

// Analysis

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AnalysisDefinitionTemplate {
    pub data_set_identifier_declarations: Vec<DeclarationTemplate>,
    #[serde(default)]
    pub sheets: Vec<SheetTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct DeclarationTemplate {
    pub identifier: String,
    pub data_set_arn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct SheetTemplate {
    pub sheet_id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub visuals: Vec<VisualTemplate>,
}

/// Only line charts are supported.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct VisualTemplate {
    pub line_chart_visual: Option<LineChartVisualTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct LineChartVisualTemplate {
    pub visual_id: String,
    pub title: Option<TitleTemplate>,
    pub chart_configuration: Option<LineChartConfigurationTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct TitleTemplate {
    pub visibility: Option<String>,
    pub format_text: Option<FormatTextTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FormatTextTemplate {
    pub plain_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct LineChartConfigurationTemplate {
    pub field_wells: Option<FieldWellsTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FieldWellsTemplate {
    pub line_chart_aggregated_field_wells: Option<AggregatedFieldWellsTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AggregatedFieldWellsTemplate {
    #[serde(default)]
    pub category: Vec<DimensionFieldTemplate>,
    #[serde(default)]
    pub values: Vec<MeasureFieldTemplate>,
    #[serde(default)]
    pub colors: Vec<DimensionFieldTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct DimensionFieldTemplate {
    pub categorical_dimension_field: Option<FieldTemplate>,
    pub numerical_dimension_field: Option<FieldTemplate>,
    pub date_dimension_field: Option<DateFieldTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FieldTemplate {
    pub field_id: String,
    pub column: ColumnTemplate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct DateFieldTemplate {
    pub field_id: String,
    pub column: ColumnTemplate,
    pub date_granularity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ColumnTemplate {
    pub data_set_identifier: String,
    pub column_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct MeasureFieldTemplate {
    pub numerical_measure_field: Option<NumericalMeasureTemplate>,
    pub categorical_measure_field: Option<CategoricalMeasureTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct NumericalMeasureTemplate {
    pub field_id: String,
    pub column: ColumnTemplate,
    pub aggregation_function: Option<NumericalAggregationTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct NumericalAggregationTemplate {
    pub simple_numerical_aggregation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct CategoricalMeasureTemplate {
    pub field_id: String,
    pub column: ColumnTemplate,
    pub aggregation_function: Option<String>,
}

impl TryFrom<ColumnTemplate> for ColumnIdentifier {
    type Error = Error;

    fn try_from(template: ColumnTemplate) -> Result<Self, Error> {
        Ok(ColumnIdentifier::builder()
            .data_set_identifier(template.data_set_identifier)
            .column_name(template.column_name)
            .build()?)
    }
}

impl TryFrom<DimensionFieldTemplate> for DimensionField {
    type Error = Error;

    fn try_from(template: DimensionFieldTemplate) -> Result<Self, Error> {
        let categorical = template
            .categorical_dimension_field
            .map(|field| -> Result<_, Error> {
                Ok(CategoricalDimensionField::builder()
                    .field_id(field.field_id)
                    .column(ColumnIdentifier::try_from(field.column)?)
                    .build()?)
            })
            .transpose()?;

        let numerical = template
            .numerical_dimension_field
            .map(|field| -> Result<_, Error> {
                Ok(NumericalDimensionField::builder()
                    .field_id(field.field_id)
                    .column(ColumnIdentifier::try_from(field.column)?)
                    .build()?)
            })
            .transpose()?;

        let date = template
            .date_dimension_field
            .map(|field| -> Result<_, Error> {
                Ok(DateDimensionField::builder()
                    .field_id(field.field_id)
                    .column(ColumnIdentifier::try_from(field.column)?)
                    .set_date_granularity(
                        field.date_granularity.as_deref().map(TimeGranularity::from),
                    )
                    .build()?)
            })
            .transpose()?;

        Ok(DimensionField::builder()
            .set_categorical_dimension_field(categorical)
            .set_numerical_dimension_field(numerical)
            .set_date_dimension_field(date)
            .build())
    }
}

impl TryFrom<MeasureFieldTemplate> for MeasureField {
    type Error = Error;

    fn try_from(template: MeasureFieldTemplate) -> Result<Self, Error> {
        let numerical = template
            .numerical_measure_field
            .map(|field| -> Result<_, Error> {
                let aggregation = field.aggregation_function.map(|function| {
                    NumericalAggregationFunction::builder()
                        .set_simple_numerical_aggregation(
                            function
                                .simple_numerical_aggregation
                                .as_deref()
                                .map(SimpleNumericalAggregationFunction::from),
                        )
                        .build()
                });

                Ok(NumericalMeasureField::builder()
                    .field_id(field.field_id)
                    .column(ColumnIdentifier::try_from(field.column)?)
                    .set_aggregation_function(aggregation)
                    .build()?)
            })
            .transpose()?;

        let categorical = template
            .categorical_measure_field
            .map(|field| -> Result<_, Error> {
                Ok(CategoricalMeasureField::builder()
                    .field_id(field.field_id)
                    .column(ColumnIdentifier::try_from(field.column)?)
                    .set_aggregation_function(
                        field
                            .aggregation_function
                            .as_deref()
                            .map(CategoricalAggregationFunction::from),
                    )
                    .build()?)
            })
            .transpose()?;

        Ok(MeasureField::builder()
            .set_numerical_measure_field(numerical)
            .set_categorical_measure_field(categorical)
            .build())
    }
}

impl From<TitleTemplate> for VisualTitleLabelOptions {
    fn from(template: TitleTemplate) -> Self {
        let format_text = template.format_text.map(|text| {
            ShortFormatText::builder()
                .set_plain_text(text.plain_text)
                .build()
        });

        VisualTitleLabelOptions::builder()
            .set_visibility(template.visibility.as_deref().map(Visibility::from))
            .set_format_text(format_text)
            .build()
    }
}

impl TryFrom<LineChartVisualTemplate> for LineChartVisual {
    type Error = Error;

    fn try_from(template: LineChartVisualTemplate) -> Result<Self, Error> {
        let field_wells = template
            .chart_configuration
            .and_then(|configuration| configuration.field_wells)
            .map(|wells| -> Result<_, Error> {
                let aggregated = wells
                    .line_chart_aggregated_field_wells
                    .map(|aggregated| -> Result<_, Error> {
                        Ok(LineChartAggregatedFieldWells::builder()
                            .set_category(non_empty(convert_all(aggregated.category)?))
                            .set_values(non_empty(convert_all(aggregated.values)?))
                            .set_colors(non_empty(convert_all(aggregated.colors)?))
                            .build())
                    })
                    .transpose()?;

                Ok(LineChartFieldWells::builder()
                    .set_line_chart_aggregated_field_wells(aggregated)
                    .build())
            })
            .transpose()?;

        let chart_configuration = field_wells.map(|wells| {
            LineChartConfiguration::builder()
                .field_wells(wells)
                .build()
        });

        Ok(LineChartVisual::builder()
            .visual_id(template.visual_id)
            .set_title(template.title.map(VisualTitleLabelOptions::from))
            .set_chart_configuration(chart_configuration)
            .build()?)
    }
}

impl TryFrom<VisualTemplate> for Visual {
    type Error = Error;

    fn try_from(template: VisualTemplate) -> Result<Self, Error> {
        let line_chart = template
            .line_chart_visual
            .map(LineChartVisual::try_from)
            .transpose()?;

        Ok(Visual::builder().set_line_chart_visual(line_chart).build())
    }
}

impl TryFrom<SheetTemplate> for SheetDefinition {
    type Error = Error;

    fn try_from(template: SheetTemplate) -> Result<Self, Error> {
        Ok(SheetDefinition::builder()
            .sheet_id(template.sheet_id)
            .set_name(template.name)
            .set_visuals(non_empty(convert_all(template.visuals)?))
            .build()?)
    }
}

impl TryFrom<DeclarationTemplate> for DataSetIdentifierDeclaration {
    type Error = Error;

    fn try_from(template: DeclarationTemplate) -> Result<Self, Error> {
        Ok(DataSetIdentifierDeclaration::builder()
            .identifier(template.identifier)
            .data_set_arn(template.data_set_arn)
            .build()?)
    }
}

impl TryFrom<AnalysisDefinitionTemplate> for AnalysisDefinition {
    type Error = Error;

    fn try_from(template: AnalysisDefinitionTemplate) -> Result<Self, Error> {
        Ok(AnalysisDefinition::builder()
            .set_data_set_identifier_declarations(Some(convert_all(
                template.data_set_identifier_declarations,
            )?))
            .set_sheets(non_empty(convert_all(template.sheets)?))
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn asset(name: &str) -> Value {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("assets")
            .join(name);
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_data_source_parameters_from_asset() {
        let mut document = asset("datasource-params.json");
        document["S3Parameters"]["ManifestFileLocation"]["Bucket"] = json!("fantasy-bucket");

        let template: DataSourceParametersTemplate = decode("data source", document).unwrap();
        let parameters = DataSourceParameters::try_from(template).unwrap();

        assert!(parameters.is_s3_parameters());
        assert!(format!("{:?}", parameters).contains("fantasy-bucket"));
    }

    #[test]
    fn test_data_source_parameters_missing_key_is_unsupported() {
        let document = json!({ "S3Parameters": { "ManifestFileLocation": { "Bucket": "b" } } });

        let result: Result<DataSourceParametersTemplate, Error> = decode("data source", document);

        assert!(matches!(
            result,
            Err(Error::UnsupportedTemplate {
                kind: "data source",
                ..
            })
        ));
    }

    #[test]
    fn test_physical_table_from_asset() {
        let template: PhysicalTableTemplate =
            decode("physical table", asset("dataset-physical-map.json")).unwrap();

        assert_eq!(template.s3_source.input_columns.len(), 6);

        let table = PhysicalTable::try_from(template).unwrap();

        assert!(table.is_s3_source());
    }

    #[test]
    fn test_logical_table_from_asset() {
        let mut document = asset("dataset-logical-map.json");
        document["Alias"] = json!("fantasy-ds");
        document["Source"]["PhysicalTableId"] = json!("physical-1");

        let template: LogicalTableTemplate = decode("logical table", document).unwrap();
        assert!(!template.data_transforms.is_empty());

        let table = LogicalTable::try_from(template).unwrap();
        let rendered = format!("{:?}", table);

        assert!(rendered.contains("fantasy-ds"));
        assert!(rendered.contains("physical-1"));
    }

    #[test]
    fn test_logical_table_rejects_unknown_transform() {
        let document = json!({
            "Alias": "fantasy-ds",
            "DataTransforms": [{ "TagColumnOperation": { "ColumnName": "Player" } }],
            "Source": { "PhysicalTableId": "physical-1" }
        });

        let result: Result<LogicalTableTemplate, Error> = decode("logical table", document);

        assert!(result.is_err());
    }

    #[test]
    fn test_analysis_definition_from_asset() {
        let mut document = asset("analysis-definition.json");
        document["DataSetIdentifierDeclarations"][0]["Identifier"] = json!("fantasy-ds");
        document["Sheets"][0]["SheetId"] = json!("sheet-1");

        let template: AnalysisDefinitionTemplate =
            decode("analysis definition", document).unwrap();
        let definition = AnalysisDefinition::try_from(template).unwrap();
        let rendered = format!("{:?}", definition);

        assert!(rendered.contains("sheet-1"));
        assert!(rendered.contains("fantasy-ds"));
    }

    #[test]
    fn test_analysis_definition_rejects_unsupported_visual() {
        let document = json!({
            "DataSetIdentifierDeclarations": [
                { "Identifier": "fantasy-ds", "DataSetArn": "arn:aws:quicksight:us-east-1:1:dataset/x" }
            ],
            "Sheets": [
                { "SheetId": "sheet-1", "Visuals": [{ "PieChartVisual": { "VisualId": "pie" } }] }
            ]
        });

        let result: Result<AnalysisDefinitionTemplate, Error> =
            decode("analysis definition", document);

        assert!(matches!(result, Err(Error::UnsupportedTemplate { .. })));
    }
}
