use chrono::{DateTime, Utc};
use diesel::{Associations, Identifiable, Queryable, Selectable};

use super::schema::{definitions, examples, synonyms, translations, words};
use crate::model::{Annotation, LanguageCode};

#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = words)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WordRow {
    pub id: i32,
    pub word: String,
    pub language: String,
    pub last_updated: DateTime<Utc>,
}

/// The four annotation tables share their layout and differ only in the name of the text column.
macro_rules! annotation_row {
    ($(#[$meta:meta])* $row:ident, $table:ident, $text:ident) => {
        $(#[$meta])*
        #[derive(Queryable, Selectable, Identifiable, Associations, Clone, Debug)]
        #[diesel(table_name = $table)]
        #[diesel(belongs_to(WordRow, foreign_key = word_id))]
        #[diesel(check_for_backend(diesel::pg::Pg))]
        pub struct $row {
            pub id: i32,
            pub word_id: i32,
            pub language: String,
            pub $text: String,
        }

        impl From<$row> for Annotation {
            fn from(row: $row) -> Self {
                Annotation {
                    language: LanguageCode::from_database(row.language),
                    text: row.$text,
                }
            }
        }
    };
}

annotation_row!(DefinitionRow, definitions, definition);
annotation_row!(SynonymRow, synonyms, synonym);
annotation_row!(TranslationRow, translations, translation);
annotation_row!(ExampleRow, examples, example);
