use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

id_newtype!(CourseId);
id_newtype!(CategoryId);
id_newtype!(SectionId);
id_newtype!(ModuleTypeId);
id_newtype!(CourseModuleId);
id_newtype!(InstanceId);
id_newtype!(GradeCategoryId);
id_newtype!(GradeItemId);
id_newtype!(IssueId);
