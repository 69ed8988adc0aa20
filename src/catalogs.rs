use crate::error::BundleError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CodeSystem half of a catalog's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSystemInfo {
    pub oid: String,
    pub name: String,
    pub title: String,
    pub description: String,
    /// Prepended to each display to form the concept definition
    pub definition_prefix: String,
}

/// ValueSet half of a catalog's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSetInfo {
    pub oid: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub purpose: String,
}

/// Hand-authored metadata for one CSV catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    pub csv_file: String,
    pub bundle_name: String,
    pub code_system: CodeSystemInfo,
    pub value_set: ValueSetInfo,
}

impl BundleConfig {
    /// Matches either the CSV file name or the bundle slug
    pub fn matches(&self, key: &str) -> bool {
        self.csv_file == key || self.bundle_name == key
    }
}

const CS_OID_ROOT: &str = "urn:oid:2.16.840.1.113883.4.642.1";
const VS_OID_ROOT: &str = "urn:oid:2.16.840.1.113883.4.642.3";

struct Builtin {
    csv_file: &'static str,
    bundle_name: &'static str,
    serial: u32,
    name: &'static str,
    title: &'static str,
    cs_description: &'static str,
    definition_prefix: &'static str,
    vs_description: &'static str,
    purpose: &'static str,
}

impl Builtin {
    fn into_config(self) -> BundleConfig {
        BundleConfig {
            csv_file: self.csv_file.to_string(),
            bundle_name: self.bundle_name.to_string(),
            code_system: CodeSystemInfo {
                oid: format!("{}.{}", CS_OID_ROOT, self.serial),
                name: self.name.to_string(),
                title: self.title.to_string(),
                description: self.cs_description.to_string(),
                definition_prefix: self.definition_prefix.to_string(),
            },
            value_set: ValueSetInfo {
                oid: format!("{}.{}", VS_OID_ROOT, self.serial),
                name: format!("{}VS", self.name),
                title: format!("{} Value Set", self.title),
                description: self.vs_description.to_string(),
                purpose: self.purpose.to_string(),
            },
        }
    }
}

/// The master-data catalogs shipped with the FHIR service, in generation order
pub fn builtin() -> Vec<BundleConfig> {
    vec![
        Builtin {
            csv_file: "allergies.csv",
            bundle_name: "allergies",
            serial: 2001,
            name: "Allergies",
            title: "Allergies and Allergens",
            cs_description: "A comprehensive code system for allergies and allergens using SNOMED CT codes",
            definition_prefix: "Allergy to",
            vs_description: "Value set containing all allergies and allergens for use in AllergyIntolerance resources",
            purpose: "To provide a standardized set of allergy codes for use across FHIR resources",
        },
        Builtin {
            csv_file: "brand.csv",
            bundle_name: "brand-medications",
            serial: 2002,
            name: "BrandMedications",
            title: "Brand Medications",
            cs_description: "A comprehensive code system for brand medications using ERP codes",
            definition_prefix: "Brand medication",
            vs_description: "Value set containing all brand medications for use in Medication and MedicationRequest resources",
            purpose: "To provide a standardized set of brand medication codes for use across FHIR resources",
        },
        Builtin {
            csv_file: "department.csv",
            bundle_name: "departments",
            serial: 2003,
            name: "Departments",
            title: "Hospital Departments",
            cs_description: "A comprehensive code system for hospital departments and clinical units",
            definition_prefix: "Department",
            vs_description: "Value set containing all hospital departments for use in Organization and Location resources",
            purpose: "To provide a standardized set of department codes for use across FHIR resources",
        },
        Builtin {
            csv_file: "formulary.csv",
            bundle_name: "formulary",
            serial: 2004,
            name: "Formulary",
            title: "Generic Formulary Medications",
            cs_description: "A comprehensive code system for generic formulary medications",
            definition_prefix: "Generic formulary medication",
            vs_description: "Value set containing all generic formulary medications for use in Medication and MedicationRequest resources",
            purpose: "To provide a standardized set of formulary medication codes for use across FHIR resources",
        },
        Builtin {
            csv_file: "frequency.csv",
            bundle_name: "frequency",
            serial: 2005,
            name: "Frequency",
            title: "Medication Frequency",
            cs_description: "A comprehensive code system for medication dosing frequency and timing",
            definition_prefix: "Medication frequency",
            vs_description: "Value set containing all medication frequency codes for use in MedicationRequest and dosage instructions",
            purpose: "To provide a standardized set of frequency codes for medication dosing instructions",
        },
        Builtin {
            csv_file: "instruction.csv",
            bundle_name: "instructions",
            serial: 2006,
            name: "Instructions",
            title: "Medication Instructions",
            cs_description: "A comprehensive code system for medication timing and dosing instructions",
            definition_prefix: "Medication instruction",
            vs_description: "Value set containing all medication instruction codes for use in MedicationRequest and dosage instructions",
            purpose: "To provide a standardized set of instruction codes for medication timing and dosing",
        },
        Builtin {
            csv_file: "procedure.csv",
            bundle_name: "procedures",
            serial: 2007,
            name: "Procedures",
            title: "Medical Procedures",
            cs_description: "A comprehensive code system for medical procedures and diagnostic tests",
            definition_prefix: "Medical procedure",
            vs_description: "Value set containing all medical procedures for use in Procedure and ServiceRequest resources",
            purpose: "To provide a standardized set of procedure codes for use across FHIR resources",
        },
        Builtin {
            csv_file: "route.csv",
            bundle_name: "route",
            serial: 2008,
            name: "Route",
            title: "Medication Route of Administration",
            cs_description: "A comprehensive code system for medication routes of administration",
            definition_prefix: "Medication route",
            vs_description: "Value set containing all medication routes for use in MedicationRequest and dosage instructions",
            purpose: "To provide a standardized set of route codes for medication administration",
        },
        Builtin {
            csv_file: "specialty.csv",
            bundle_name: "hospital-specialties",
            serial: 2009,
            name: "HospitalSpecialties",
            title: "Hospital Clinical Specialties",
            cs_description: "A comprehensive code system for hospital clinical specialties and subspecialties",
            definition_prefix: "Clinical specialty",
            vs_description: "Value set containing all hospital clinical specialties for use in Practitioner and PractitionerRole resources",
            purpose: "To provide a standardized set of hospital specialty codes for use across FHIR resources",
        },
        Builtin {
            csv_file: "strength.csv",
            bundle_name: "strength",
            serial: 2010,
            name: "Strength",
            title: "Medication Strength Units",
            cs_description: "A comprehensive code system for medication strength units and measurements",
            definition_prefix: "Unit of medication strength",
            vs_description: "Value set containing all medication strength units for use in Medication and dosage instructions",
            purpose: "To provide a standardized set of strength unit codes for medication dosing",
        },
    ]
    .into_iter()
    .map(Builtin::into_config)
    .collect()
}

/// Find a catalog by CSV file name or bundle slug
pub fn find<'a>(catalogs: &'a [BundleConfig], key: &str) -> Result<&'a BundleConfig, BundleError> {
    catalogs
        .iter()
        .find(|c| c.matches(key))
        .ok_or_else(|| BundleError::UnknownCatalog(key.to_string()))
}

/// Load a replacement catalog table from a JSON array of `BundleConfig`
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<BundleConfig>, BundleError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| BundleError::Config(format!("{}: {}", path.display(), e)))?;

    let catalogs: Vec<BundleConfig> = serde_json::from_str(&content)
        .map_err(|e| BundleError::Config(format!("{}: {}", path.display(), e)))?;

    if catalogs.is_empty() {
        return Err(BundleError::Config(format!(
            "{}: catalog list is empty",
            path.display()
        )));
    }

    for (i, catalog) in catalogs.iter().enumerate() {
        if catalogs[..i]
            .iter()
            .any(|c| c.bundle_name == catalog.bundle_name)
        {
            return Err(BundleError::Config(format!(
                "{}: duplicate bundle_name '{}'",
                path.display(),
                catalog.bundle_name
            )));
        }
    }

    Ok(catalogs)
}
