//! Default data inserted into a freshly created lexicon

use rusqlite::{params, Connection};

use super::schema::SchemaProfile;

/// (name, description, icon, color)
pub const DEFAULT_CATEGORIES: [(&str, &str, &str, &str); 10] = [
    ("Animais", "Animais e seres vivos", "fas fa-paw", "#38a169"),
    ("Família", "Parentesco e relações familiares", "fas fa-users", "#e53e3e"),
    ("Natureza", "Elementos naturais", "fas fa-tree", "#2f855a"),
    ("Alimentos", "Comidas e bebidas", "fas fa-utensils", "#d69e2e"),
    ("Corpo Humano", "Partes do corpo", "fas fa-user-md", "#3182ce"),
    ("Verbos", "Ações e atividades", "fas fa-running", "#805ad5"),
    ("Adjetivos", "Qualidades e características", "fas fa-font", "#d53f8c"),
    ("Números", "Números e quantidades", "fas fa-sort-numeric-up", "#dd6b20"),
    ("Cores", "Cores", "fas fa-palette", "#ed8936"),
    ("Tempo", "Tempo, dias, meses", "fas fa-clock", "#4c51bf"),
];

struct Sample {
    headword: &'static str,
    gloss: &'static str,
    word_class: &'static str,
    tone: &'static str,
    example_source: &'static str,
    example_target: &'static str,
    notes: Option<&'static str>,
}

const SAMPLES: [Sample; 5] = [
    Sample {
        headword: "muɾé",
        gloss: "cão, cachorro",
        word_class: "substantivo",
        tone: "HL",
        example_source: "Muɾé wa mwene wapɨhɨra",
        example_target: "O cão do dono está latindo",
        notes: Some("Animal doméstico da família dos canídeos"),
    },
    Sample {
        headword: "muthu",
        gloss: "pessoa, ser humano",
        word_class: "substantivo",
        tone: "HL",
        example_source: "Muthu wa kuwa ni mzuri",
        example_target: "Aquela pessoa é boa",
        notes: Some("Termo geral para pessoa"),
    },
    Sample {
        headword: "kulowa",
        gloss: "comer",
        word_class: "verbo",
        tone: "LHL",
        example_source: "Ana kulowa wali",
        example_target: "Ele está comendo arroz",
        notes: Some("Verbo de ação básica"),
    },
    Sample {
        headword: "muti",
        gloss: "árvore",
        word_class: "substantivo",
        tone: "HL",
        example_source: "Muti wangu",
        example_target: "Minha árvore",
        notes: None,
    },
    Sample {
        headword: "nyumba",
        gloss: "casa",
        word_class: "substantivo",
        tone: "LH",
        example_source: "Nyumba yake",
        example_target: "Sua casa",
        notes: None,
    },
];

/// Insert default categories and the profile's sample entries (verified)
pub(super) fn seed_defaults(conn: &Connection, profile: &SchemaProfile) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO categories (name, description, icon, color, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (i, (name, description, icon, color)) in DEFAULT_CATEGORIES.iter().enumerate() {
        stmt.execute(params![name, description, icon, color, i as i64])?;
    }

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO entries (headword, gloss, word_class, tone, example_source, example_target, notes, verified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
    )?;
    for s in SAMPLES.iter().take(profile.sample_entries) {
        stmt.execute(params![
            s.headword,
            s.gloss,
            s.word_class,
            s.tone,
            s.example_source,
            s.example_target,
            s.notes
        ])?;
    }

    Ok(())
}
