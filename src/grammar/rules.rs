//! The static grammar over 2.0 instruction tokens.
//!
//! One rule per `::=`. A line without `::=` continues the previous
//! right-hand side. Symbols that never appear on a left-hand side are
//! terminals and match a token kind exactly.

pub const GRAMMAR: &str = r#"
# =============================================================================
# Scopes and statement sequences
# =============================================================================

code ::= stmts
code ::=

stmts ::= stmts stmt
stmts ::= stmt

stmts_opt ::= stmts
stmts_opt ::= passstmt
passstmt ::=

# =============================================================================
# Definitions
# =============================================================================

stmt ::= funcdef
funcdef ::= mkfunc STORE_FAST
funcdef ::= mkfunc STORE_NAME
funcdef ::= mkfunc STORE_GLOBAL

stmt ::= classdef
classdef ::= LOAD_CONST expr mkfunc
        CALL_FUNCTION_0 BUILD_CLASS STORE_NAME
classdef ::= LOAD_CONST expr mkfunc
        CALL_FUNCTION_0 BUILD_CLASS STORE_FAST
classdef ::= LOAD_CONST expr mkfunc
        CALL_FUNCTION_0 BUILD_CLASS STORE_GLOBAL

# =============================================================================
# Assignment
# =============================================================================

stmt ::= assign
assign ::= expr DUP_TOP designList
assign ::= expr designator

designList ::= designator designator
designList ::= designator DUP_TOP designList

designator ::= STORE_FAST
designator ::= STORE_NAME
designator ::= STORE_GLOBAL
designator ::= expr STORE_ATTR
designator ::= expr STORE_SLICE+0
designator ::= expr expr STORE_SLICE+1
designator ::= expr expr STORE_SLICE+2
designator ::= expr expr expr STORE_SLICE+3
designator ::= store_subscr
designator ::= unpack
store_subscr ::= expr expr STORE_SUBSCR

stmt ::= augassign1
stmt ::= augassign2
augassign1 ::= expr expr inplace_op designator
augassign1 ::= expr expr inplace_op ROT_THREE STORE_SUBSCR
augassign1 ::= expr expr inplace_op ROT_TWO STORE_SLICE+0
augassign1 ::= expr expr inplace_op ROT_THREE STORE_SLICE+1
augassign1 ::= expr expr inplace_op ROT_THREE STORE_SLICE+2
augassign1 ::= expr expr inplace_op ROT_FOUR STORE_SLICE+3
augassign2 ::= expr DUP_TOP LOAD_ATTR expr
        inplace_op ROT_TWO STORE_ATTR

inplace_op ::= INPLACE_ADD
inplace_op ::= INPLACE_SUBTRACT
inplace_op ::= INPLACE_MULTIPLY
inplace_op ::= INPLACE_DIVIDE
inplace_op ::= INPLACE_MODULO
inplace_op ::= INPLACE_POWER
inplace_op ::= INPLACE_LSHIFT
inplace_op ::= INPLACE_RSHIFT
inplace_op ::= INPLACE_AND
inplace_op ::= INPLACE_XOR
inplace_op ::= INPLACE_OR

# =============================================================================
# Print
# =============================================================================

stmt ::= print_stmt
stmt ::= print_stmt_nl
stmt ::= print_nl_stmt
print_stmt ::= expr PRINT_ITEM
print_nl_stmt ::= PRINT_NEWLINE
print_stmt_nl ::= print_stmt print_nl_stmt

stmt ::= print_to
stmt ::= print_to_nl
stmt ::= print_nl_to
print_to ::= expr print_to_items POP_TOP
print_to_nl ::= expr print_to_items PRINT_NEWLINE_TO
print_nl_to ::= expr PRINT_NEWLINE_TO
print_to_items ::= print_to_items print_to_item
print_to_items ::= print_to_item
print_to_item ::= DUP_TOP expr ROT_TWO PRINT_ITEM_TO

# =============================================================================
# Import
# =============================================================================

stmt ::= importstmt2
stmt ::= importfrom2
stmt ::= importstar2

importstmt2 ::= LOAD_CONST import_as
importstar2 ::= LOAD_CONST IMPORT_NAME IMPORT_STAR
importfrom2 ::= LOAD_CONST IMPORT_NAME importlist2 POP_TOP
importlist2 ::= importlist2 import_as
importlist2 ::= import_as

import_as ::= IMPORT_NAME STORE_FAST
import_as ::= IMPORT_NAME STORE_NAME
import_as ::= IMPORT_NAME attr_path STORE_FAST
import_as ::= IMPORT_NAME attr_path STORE_NAME
import_as ::= IMPORT_FROM STORE_FAST
import_as ::= IMPORT_FROM STORE_NAME
attr_path ::= attr_path LOAD_ATTR
attr_path ::= LOAD_ATTR

# =============================================================================
# Simple statements
# =============================================================================

stmt ::= call_stmt
call_stmt ::= expr POP_TOP

stmt ::= return_stmt
return_stmt ::= expr RETURN_VALUE

stmt ::= break_stmt
break_stmt ::= BREAK_LOOP

stmt ::= continue_stmt
continue_stmt ::= JUMP_ABSOLUTE

stmt ::= raise_stmt
raise_stmt ::= exprlist RAISE_VARARGS
raise_stmt ::= nullexprlist RAISE_VARARGS

stmt ::= exec_stmt
exec_stmt ::= expr exprlist DUP_TOP EXEC_STMT
exec_stmt ::= expr exprlist EXEC_STMT

stmt ::= DELETE_FAST
stmt ::= DELETE_NAME
stmt ::= DELETE_GLOBAL
stmt ::= expr DELETE_SLICE+0
stmt ::= expr expr DELETE_SLICE+1
stmt ::= expr expr DELETE_SLICE+2
stmt ::= expr expr expr DELETE_SLICE+3
stmt ::= delete_subscr
delete_subscr ::= expr expr DELETE_SUBSCR
stmt ::= expr DELETE_ATTR

stmt ::= assert
stmt ::= assert2
assert ::= expr JUMP_IF_FALSE POP_TOP
        expr JUMP_IF_TRUE POP_TOP
        LOAD_GLOBAL RAISE_VARARGS
        COME_FROM COME_FROM POP_TOP
assert2 ::= expr JUMP_IF_FALSE POP_TOP
        expr JUMP_IF_TRUE POP_TOP
        LOAD_GLOBAL expr RAISE_VARARGS
        COME_FROM COME_FROM POP_TOP

# =============================================================================
# Compound statements
# =============================================================================

condjmp ::= JUMP_IF_FALSE POP_TOP
condjmp ::= JUMP_IF_TRUE POP_TOP

stmt ::= ifstmt
stmt ::= ifelsestmt
ifstmt ::= expr condjmp stmts_opt
        JUMP_FORWARD COME_FROM POP_TOP
        COME_FROM
ifelsestmt ::= expr condjmp stmts_opt
        JUMP_FORWARD COME_FROM
        POP_TOP stmts COME_FROM

stmt ::= whilestmt
stmt ::= whileelsestmt
whilestmt ::= SETUP_LOOP
        expr JUMP_IF_FALSE POP_TOP
        stmts_opt JUMP_ABSOLUTE
        COME_FROM POP_TOP POP_BLOCK COME_FROM
whileelsestmt ::= SETUP_LOOP
        expr JUMP_IF_FALSE POP_TOP
        stmts_opt JUMP_ABSOLUTE
        COME_FROM POP_TOP POP_BLOCK
        stmts COME_FROM

stmt ::= forstmt
stmt ::= forelsestmt
forstmt ::= SETUP_LOOP expr LOAD_CONST
        FOR_LOOP designator
        stmts_opt JUMP_ABSOLUTE
        COME_FROM POP_BLOCK COME_FROM
forelsestmt ::= SETUP_LOOP expr LOAD_CONST
        FOR_LOOP designator
        stmts_opt JUMP_ABSOLUTE
        COME_FROM POP_BLOCK stmts COME_FROM

stmt ::= trystmt
stmt ::= tryfinallystmt
trystmt ::= SETUP_EXCEPT stmts_opt
        POP_BLOCK JUMP_FORWARD
        COME_FROM except_stmt

try_end ::= END_FINALLY COME_FROM
try_end ::= except_else
except_else ::= END_FINALLY COME_FROM stmts

except_stmt ::= except_cond except_stmt COME_FROM
except_stmt ::= except_conds try_end COME_FROM
except_stmt ::= except try_end COME_FROM
except_stmt ::= try_end

except_conds ::= except_cond except_conds COME_FROM
except_conds ::=

except_cond ::= except_cond1
except_cond ::= except_cond2
except_cond1 ::= DUP_TOP expr COMPARE_OP
        JUMP_IF_FALSE
        POP_TOP POP_TOP POP_TOP POP_TOP
        stmts_opt JUMP_FORWARD COME_FROM
        POP_TOP
except_cond2 ::= DUP_TOP expr COMPARE_OP
        JUMP_IF_FALSE
        POP_TOP POP_TOP designator POP_TOP
        stmts_opt JUMP_FORWARD COME_FROM
        POP_TOP
except ::= POP_TOP POP_TOP POP_TOP
        stmts_opt JUMP_FORWARD

tryfinallystmt ::= SETUP_FINALLY stmts_opt
        POP_BLOCK LOAD_CONST
        COME_FROM stmts_opt END_FINALLY

# =============================================================================
# List comprehensions
# =============================================================================

expr ::= list_compr
list_compr ::= lc_prep lc_for lc_cleanup
lc_prep ::= BUILD_LIST_0 DUP_TOP LOAD_ATTR STORE_NAME
lc_prep ::= BUILD_LIST_0 DUP_TOP LOAD_ATTR STORE_FAST
lc_for ::= expr LOAD_CONST
        FOR_LOOP designator
        lc_inner JUMP_ABSOLUTE
        COME_FROM
lc_inner ::= lc_for
lc_inner ::= lc_if
lc_inner ::= lc_body
lc_if ::= expr condjmp lc_inner
        JUMP_FORWARD COME_FROM POP_TOP
        COME_FROM
lc_body ::= LOAD_NAME expr CALL_FUNCTION_1 POP_TOP
lc_body ::= LOAD_FAST expr CALL_FUNCTION_1 POP_TOP
lc_cleanup ::= DELETE_NAME
lc_cleanup ::= DELETE_FAST

# =============================================================================
# Expressions
# =============================================================================

expr ::= mklambda
expr ::= mkfunc
expr ::= LOAD_FAST
expr ::= LOAD_NAME
expr ::= LOAD_CONST
expr ::= LOAD_GLOBAL
expr ::= LOAD_LOCALS
expr ::= expr LOAD_ATTR
expr ::= binary_expr

binary_expr ::= expr expr binary_op
binary_op ::= BINARY_ADD
binary_op ::= BINARY_SUBTRACT
binary_op ::= BINARY_MULTIPLY
binary_op ::= BINARY_DIVIDE
binary_op ::= BINARY_MODULO
binary_op ::= BINARY_LSHIFT
binary_op ::= BINARY_RSHIFT
binary_op ::= BINARY_AND
binary_op ::= BINARY_OR
binary_op ::= BINARY_XOR
binary_op ::= BINARY_POWER

expr ::= binary_subscr
binary_subscr ::= expr expr BINARY_SUBSCR
expr ::= expr expr DUP_TOPX_2 BINARY_SUBSCR
expr ::= cmp
expr ::= expr UNARY_POSITIVE
expr ::= expr UNARY_NEGATIVE
expr ::= expr UNARY_CONVERT
expr ::= expr UNARY_INVERT
expr ::= expr UNARY_NOT
expr ::= mapexpr
expr ::= expr SLICE+0
expr ::= expr expr SLICE+1
expr ::= expr expr SLICE+2
expr ::= expr expr expr SLICE+3
expr ::= expr DUP_TOP SLICE+0
expr ::= expr expr DUP_TOPX_2 SLICE+1
expr ::= expr expr DUP_TOPX_2 SLICE+2
expr ::= expr expr expr DUP_TOPX_3 SLICE+3
expr ::= and
expr ::= or
or ::= expr JUMP_IF_TRUE POP_TOP expr COME_FROM
and ::= expr JUMP_IF_FALSE POP_TOP expr COME_FROM

cmp ::= cmp_list
cmp ::= compare
compare ::= expr expr COMPARE_OP
cmp_list ::= expr cmp_list1 ROT_TWO POP_TOP
        COME_FROM
cmp_list1 ::= expr DUP_TOP ROT_THREE
        COMPARE_OP JUMP_IF_FALSE POP_TOP
        cmp_list1 COME_FROM
cmp_list1 ::= expr DUP_TOP ROT_THREE
        COMPARE_OP JUMP_IF_FALSE POP_TOP
        cmp_list2 COME_FROM
cmp_list2 ::= expr COMPARE_OP JUMP_FORWARD

mapexpr ::= BUILD_MAP kvlist
kvlist ::= kvlist kv
kvlist ::=
kv ::= DUP_TOP expr ROT_TWO expr STORE_SUBSCR

kwarg ::= LOAD_CONST expr

exprlist ::= exprlist expr
exprlist ::= expr
nullexprlist ::=
"#;
