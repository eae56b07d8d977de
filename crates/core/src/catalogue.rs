//! The embedded medicine catalogue.
//!
//! The record set is fixed at compile time and never mutated; every component reads the
//! same `'static` slice.

use medinfo_types::ColorTag;
use serde::Serialize;

/// One medication entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRecord {
    pub id: u32,
    /// Display name, possibly with a parenthetical alternate name.
    pub name: &'static str,
    pub category: &'static str,
    pub uses: &'static str,
    pub dosage: &'static str,
    pub side_effects: &'static str,
    pub precautions: &'static str,
    #[serde(rename = "color")]
    pub color_tag: ColorTag,
}

/// All medicines known to the local matcher, in display order.
pub static MEDICINES: [MedicineRecord; 8] = [
    MedicineRecord {
        id: 1,
        name: "Paracetamol (Acetaminophen)",
        category: "Analgesics / Antipyretics",
        uses: "Relief of mild to moderate pain (headache, muscle ache, toothache) and reduction of fever.",
        dosage: "Adults: 500mg to 1g every 4-6 hours. Maximum 4g per day.",
        side_effects: "Nausea, stomach pain, loss of appetite, or dark urine (rare). Overdose can cause liver damage.",
        precautions: "Avoid with heavy alcohol consumption. Check for other medications containing acetaminophen.",
        color_tag: ColorTag::Blue,
    },
    MedicineRecord {
        id: 2,
        name: "Amoxicillin",
        category: "Antibiotics (Penicillin type)",
        uses: "Treatment of bacterial infections such as pneumonia, bronchitis, and infections of the ear, nose, throat, or skin.",
        dosage: "Adults: 250mg to 500mg every 8 hours, or 500mg to 875mg every 12 hours.",
        side_effects: "Diarrhea, nausea, skin rash. May cause anaphylaxis in allergic individuals.",
        precautions: "Complete the full course even if feeling better. Not effective against viral infections.",
        color_tag: ColorTag::Emerald,
    },
    MedicineRecord {
        id: 3,
        name: "Metformin",
        category: "Antidiabetics (Biguanides)",
        uses: "Management of type 2 diabetes by improving insulin sensitivity and decreasing glucose production by the liver.",
        dosage: "Initially 500mg once or twice daily. Maximum 2.5g per day.",
        side_effects: "Gastrointestinal upset (bloating, diarrhea), metallic taste in mouth.",
        precautions: "Monitor kidney function. Risk of lactic acidosis in severe kidney disease.",
        color_tag: ColorTag::Indigo,
    },
    MedicineRecord {
        id: 4,
        name: "Atorvastatin",
        category: "Statins (HMG-CoA Reductase Inhibitors)",
        uses: "Reduction of LDL cholesterol and triglycerides; prevention of cardiovascular disease.",
        dosage: "10mg to 80mg once daily.",
        side_effects: "Muscle pain (myalgia), joint pain, digestive problems.",
        precautions: "Avoid grapefruit juice. Monitor liver enzymes. Report unexplained muscle pain promptly.",
        color_tag: ColorTag::Rose,
    },
    MedicineRecord {
        id: 5,
        name: "Aspirin (Acetylsalicylic Acid)",
        category: "NSAIDs / Antiplatelets",
        uses: "Pain relief, fever reduction, anti-inflammatory, and prevention of blood clots (heart attack/stroke prophylaxis).",
        dosage: "Pain/Fever: 325mg to 650mg every 4-6 hours. Cardioprotection: 75mg to 81mg daily.",
        side_effects: "Stomach irritation, increased bleeding risk, tinnitus.",
        precautions: "Risk of Reye's syndrome in children. Use with caution in patients with asthma or ulcers.",
        color_tag: ColorTag::Blue,
    },
    MedicineRecord {
        id: 6,
        name: "Omeprazole",
        category: "Proton Pump Inhibitors (PPI)",
        uses: "GERD (Acid reflux), stomach ulcers, and Zollinger-Ellison syndrome.",
        dosage: "20mg to 40mg once daily, usually before a meal.",
        side_effects: "Headache, abdominal pain, nausea.",
        precautions: "Long-term use may decrease magnesium levels or increase fracture risk.",
        color_tag: ColorTag::Emerald,
    },
    MedicineRecord {
        id: 7,
        name: "Lisinopril",
        category: "ACE Inhibitors",
        uses: "Treatment of hypertension (high blood pressure) and heart failure.",
        dosage: "5mg to 40mg once daily.",
        side_effects: "Dry cough, dizziness, high potassium levels.",
        precautions: "Can cause harm to unborn babies. Monitor renal function and potassium.",
        color_tag: ColorTag::Indigo,
    },
    MedicineRecord {
        id: 8,
        name: "Albuterol (Salbutamol)",
        category: "Bronchodilators (Beta-2 Agonists)",
        uses: "Relief of bronchospasm in asthma, COPD, and exercise-induced bronchospasm.",
        dosage: "1-2 puffs every 4-6 hours as needed for rescue.",
        side_effects: "Tremors, increased heart rate (tachycardia), nervousness.",
        precautions: "Rescue inhaler only. If usage increases, asthma control may be inadequate.",
        color_tag: ColorTag::Rose,
    },
];

/// The full catalogue.
pub fn all() -> &'static [MedicineRecord] {
    &MEDICINES
}

/// Look up a record by identifier.
pub fn find_by_id(id: u32) -> Option<&'static MedicineRecord> {
    MEDICINES.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_has_eight_unique_ids() {
        let ids: HashSet<u32> = all().iter().map(|m| m.id).collect();
        assert_eq!(all().len(), 8);
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn test_find_by_id() {
        assert_eq!(find_by_id(5).unwrap().name, "Aspirin (Acetylsalicylic Acid)");
        assert!(find_by_id(0).is_none());
        assert!(find_by_id(9).is_none());
    }

    #[test]
    fn test_record_serializes_with_camel_case_fields() {
        let value = serde_json::to_value(find_by_id(1).unwrap()).unwrap();
        assert!(value["sideEffects"].as_str().unwrap().starts_with("Nausea"));
        assert_eq!(value["color"], "blue");
    }
}
